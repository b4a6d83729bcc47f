#![allow(dead_code)]

use bytes::Bytes;
use http::header::HeaderMap;
use http::request::Builder;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use routrie::{RequestService, RequestServiceBuilder, Router};
use std::net::SocketAddr;
use std::str::FromStr;

pub struct TestApp {
    service: RequestService,
}

/// Seals the router the way a real server would and returns an app which
/// drives requests through the full service path.
pub fn serve(router: Router) -> TestApp {
    let remote_addr = SocketAddr::from_str("127.0.0.1:4000").unwrap();
    let builder = RequestServiceBuilder::new(router);
    TestApp {
        service: builder.build(remote_addr),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestApp {
    pub fn request(&self, method: &str, path: &str) -> Builder {
        http::Request::builder()
            .method(method.to_ascii_uppercase().as_str())
            .uri(path)
    }

    pub async fn send(&self, builder: Builder) -> TestResponse {
        self.send_body(builder, Bytes::new()).await
    }

    pub async fn send_body(&self, builder: Builder, body: Bytes) -> TestResponse {
        let request = builder.body(Full::new(body)).unwrap();
        let response = self.service.call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(self.request("GET", path)).await
    }
}
