use crate::helpers;
use crate::router::Router;
use crate::RouteError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{service::Service, Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

/// A hyper [`Service`] which routes the requests of a single connection.
///
/// Each call percent-decodes the request path, acquires a pooled request
/// context, dispatches through the router and drains the buffered response.
pub struct RequestService {
    pub(crate) router: Arc<Router>,
    pub(crate) remote_addr: SocketAddr,
}

impl<B> Service<Request<B>> for RequestService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<RouteError> + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = RouteError;
    #[allow(clippy::type_complexity)]
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let router = self.router.clone();
        let remote_addr = self.remote_addr;

        let fut = async move {
            let target_path = helpers::percent_decode_request_path(req.uri().path())?;
            let method = req.method().clone();

            let ctx = router.acquire_context();
            ctx.reset(req, Some(remote_addr));

            router.dispatch(&method, &target_path, &ctx).await;

            let response = ctx.take_response();
            router.release_context(ctx);
            Ok(response)
        };

        Box::pin(fut)
    }
}

/// Seals a [`Router`] for serving and builds a [`RequestService`] per
/// connection.
///
/// Taking the router by value ends the registration phase: once it sits
/// behind the builder's `Arc`, no further routes can be added and the trees
/// are read-only for every in-flight request.
#[derive(Debug)]
pub struct RequestServiceBuilder {
    router: Arc<Router>,
}

impl RequestServiceBuilder {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    pub fn build(&self, remote_addr: SocketAddr) -> RequestService {
        RequestService {
            router: self.router.clone(),
            remote_addr,
        }
    }
}
