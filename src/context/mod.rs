//! The per-request context: captured route parameters, request accessors,
//! the response writer and the middleware continuation.

use crate::constants;
use crate::middleware::Handler;
use crate::types::RouteParams;
use crate::{Error, RouteError};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::request::Parts;
use http::{header, Method, StatusCode, Uri, Version};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response};
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::mem;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

pub use self::writer::Writer;

pub(crate) mod pool;
mod writer;

pub(crate) type ErrorHandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub(crate) type ErrorHandler = Arc<dyn Fn(Context, RouteError) -> ErrorHandlerFuture + Send + Sync + 'static>;

/// The per-request carrier handed to every route handler and middleware.
///
/// A `Context` owns the parameters captured while matching the request path,
/// accessors over the request line, headers and body, a buffered response
/// [`Writer`], a small per-request key/value bag and the continuation used
/// by middleware chains.
///
/// Cloning a `Context` is cheap (the state is shared), which lets a handler
/// move a clone into a background task; response writes from both sides are
/// serialized by the writer's lock.
///
/// Contexts are pooled: the router acquires one per request, binds the
/// request into it with [`reset`](Context::reset) and releases it once the
/// response has been drained. Every field is cleared on release, so no data
/// leaks between requests.
///
/// # Examples
///
/// ```
/// use hyper::StatusCode;
/// use routrie::{Context, Router};
///
/// fn router() -> Router {
///     let mut router = Router::new();
///     router.get("/users/:id", |ctx: Context| async move {
///         let id = ctx.param("id").unwrap_or_default();
///         ctx.string(StatusCode::OK, id)
///     });
///     router
/// }
/// # router();
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    request: Mutex<Option<RequestState>>,
    body: Mutex<BodyState>,
    params: Mutex<RouteParams>,
    next: Mutex<Option<Handler>>,
    error_handler: Mutex<Option<ErrorHandler>>,
    data: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    writer: Writer,
}

struct RequestState {
    parts: Parts,
    remote_addr: Option<SocketAddr>,
}

enum BodyState {
    Empty,
    Pending(UnsyncBoxBody<Bytes, RouteError>),
    Read(Bytes),
}

impl ContextInner {
    pub(crate) fn new() -> ContextInner {
        ContextInner {
            request: Mutex::new(None),
            body: Mutex::new(BodyState::Empty),
            params: Mutex::new(RouteParams::new()),
            next: Mutex::new(None),
            error_handler: Mutex::new(None),
            data: Mutex::new(HashMap::new()),
            writer: Writer::new(),
        }
    }

    pub(crate) fn clear(&self) {
        *self.request.lock().unwrap() = None;
        *self.body.lock().unwrap() = BodyState::Empty;
        self.params.lock().unwrap().clear();
        *self.next.lock().unwrap() = None;
        *self.error_handler.lock().unwrap() = None;
        self.data.lock().unwrap().clear();
        self.writer.reset();
    }
}

impl Context {
    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Context {
        Context { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<ContextInner> {
        &self.inner
    }

    /// Binds a fresh request into this context, clearing everything the
    /// previous request may have left behind. The error handler installed
    /// when the context was acquired stays bound.
    pub fn reset<B>(&self, request: Request<B>, remote_addr: Option<SocketAddr>)
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<RouteError> + 'static,
    {
        self.inner.params.lock().unwrap().clear();
        *self.inner.next.lock().unwrap() = None;
        self.inner.data.lock().unwrap().clear();
        self.inner.writer.reset();

        let (parts, body) = request.into_parts();
        *self.inner.request.lock().unwrap() = Some(RequestState { parts, remote_addr });
        *self.inner.body.lock().unwrap() =
            BodyState::Pending(body.map_err(Into::into).boxed_unsync());
    }

    fn with_request<T>(&self, f: impl FnOnce(&RequestState) -> T) -> Option<T> {
        self.inner.request.lock().unwrap().as_ref().map(f)
    }

    /// Returns the request method.
    pub fn method(&self) -> Method {
        self.with_request(|req| req.parts.method.clone())
            .unwrap_or_default()
    }

    /// Returns the request URI.
    pub fn uri(&self) -> Uri {
        self.with_request(|req| req.parts.uri.clone())
            .unwrap_or_default()
    }

    /// Returns the raw (undecoded) request path.
    pub fn path(&self) -> String {
        self.with_request(|req| req.parts.uri.path().to_string())
            .unwrap_or_default()
    }

    /// Returns the HTTP version of the request.
    pub fn version(&self) -> Version {
        self.with_request(|req| req.parts.version).unwrap_or_default()
    }

    /// Returns a copy of the request headers.
    pub fn headers(&self) -> HeaderMap {
        self.with_request(|req| req.parts.headers.clone())
            .unwrap_or_default()
    }

    /// Returns a single request header as a string.
    pub fn header(&self, name: &str) -> Option<String> {
        self.with_request(|req| {
            req.parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .flatten()
    }

    /// Returns a query-string value, percent-decoded.
    pub fn query(&self, name: &str) -> Option<String> {
        self.with_request(|req| {
            req.parts
                .uri
                .query()
                .and_then(|query| crate::helpers::query_value(query, name))
        })
        .flatten()
    }

    /// Returns a cookie value from the `Cookie` request header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let cookies = self.header("cookie")?;
        for pair in cookies.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(name) {
                return Some(parts.next().unwrap_or("").to_string());
            }
        }
        None
    }

    /// Returns the peer address the connection was accepted from.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.with_request(|req| req.remote_addr).flatten()
    }

    /// Resolves the client IP, preferring the `X-Forwarded-For` and
    /// `X-Real-IP` headers over the peer address.
    pub fn client_ip(&self) -> Option<String> {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            let first = forwarded
                .split(',')
                .next()
                .map(str::trim)
                .unwrap_or("")
                .to_string();
            if !first.is_empty() {
                return Some(first);
            }
        }
        if let Some(real_ip) = self.header("x-real-ip") {
            return Some(real_ip);
        }
        self.remote_addr().map(|addr| addr.ip().to_string())
    }

    /// Returns the `Authorization` request header.
    pub fn authorization(&self) -> Option<String> {
        self.header("authorization")
    }

    /// Extracts the token from a `Bearer` authorization header.
    pub fn bearer_token(&self) -> Option<String> {
        self.authorization()?
            .strip_prefix("Bearer ")
            .map(str::to_string)
    }

    /// Returns the `User-Agent` request header.
    pub fn user_agent(&self) -> Option<String> {
        self.header("user-agent")
    }

    /// Returns the `Content-Type` request header.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
    }

    /// Collects the request body into memory. The collected bytes are cached,
    /// so calling this twice returns the same data.
    pub async fn body_bytes(&self) -> crate::Result<Bytes> {
        let pending = {
            let mut slot = self.inner.body.lock().unwrap();
            match mem::replace(&mut *slot, BodyState::Empty) {
                BodyState::Empty => return Ok(Bytes::new()),
                BodyState::Read(bytes) => {
                    *slot = BodyState::Read(bytes.clone());
                    return Ok(bytes);
                }
                BodyState::Pending(body) => body,
            }
        };

        let bytes = pending.collect().await?.to_bytes();
        *self.inner.body.lock().unwrap() = BodyState::Read(bytes.clone());
        Ok(bytes)
    }

    /// Returns the value captured for the route parameter `name`.
    pub fn param(&self, name: &str) -> Option<String> {
        self.inner
            .params
            .lock()
            .unwrap()
            .get(name)
            .map(str::to_string)
    }

    /// Returns a copy of all captured route parameters.
    pub fn params(&self) -> RouteParams {
        self.inner.params.lock().unwrap().clone()
    }

    pub(crate) fn set_params(&self, params: RouteParams) {
        *self.inner.params.lock().unwrap() = params;
    }

    pub(crate) fn reserve_params(&self, capacity: usize) {
        self.inner.params.lock().unwrap().reserve(capacity);
    }

    /// Stores a request-scoped value, replacing any previous value of the
    /// same type.
    pub fn set<T: Any + Send + Sync>(&self, value: T) {
        self.inner
            .data
            .lock()
            .unwrap()
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a clone of the request-scoped value of type `T`, if one was
    /// stored by an earlier stage.
    pub fn get<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.inner
            .data
            .lock()
            .unwrap()
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub(crate) fn install_next(&self, handler: Handler) {
        *self.inner.next.lock().unwrap() = Some(handler);
    }

    pub(crate) fn clear_next(&self) {
        *self.inner.next.lock().unwrap() = None;
    }

    /// Hands control to the next stage of the middleware chain.
    ///
    /// The continuation is consumed by the call: invoking `next()` a second
    /// time within the same stage, or from the terminal route handler, is a
    /// no-op returning `Ok(())`. Code after `.await` runs once every
    /// downstream stage has returned.
    pub async fn next(&self) -> crate::Result<()> {
        let next = self.inner.next.lock().unwrap().take();
        match next {
            Some(handler) => handler(self.clone()).await,
            None => Ok(()),
        }
    }

    pub(crate) fn set_error_handler(&self, handler: ErrorHandler) {
        *self.inner.error_handler.lock().unwrap() = Some(handler);
    }

    pub(crate) fn error_handler(&self) -> Option<ErrorHandler> {
        self.inner.error_handler.lock().unwrap().clone()
    }

    /// Returns the response writer.
    pub fn writer(&self) -> &Writer {
        &self.inner.writer
    }

    /// Sets a response header, replacing any previous value.
    pub fn set_header(&self, name: &str, value: &str) -> crate::Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.inner.writer.set_header(name, value);
        Ok(())
    }

    /// Appends a response header, keeping any previous values.
    pub fn add_header(&self, name: &str, value: &str) -> crate::Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.inner.writer.add_header(name, value);
        Ok(())
    }

    /// Returns a response header previously set for this request.
    pub fn response_header(&self, name: &str) -> Option<String> {
        self.inner.writer.header(name)
    }

    /// Writes a plain-text response with the given status code.
    pub fn string<S: AsRef<str>>(&self, status: StatusCode, body: S) -> crate::Result<()> {
        self.write_response(status, constants::CONTENT_TYPE_TEXT, body.as_ref().as_bytes())
    }

    /// Serializes `value` as JSON and writes it with the given status code.
    pub fn json<T: Serialize + ?Sized>(&self, status: StatusCode, value: &T) -> crate::Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.write_response(status, constants::CONTENT_TYPE_JSON, &payload)
    }

    /// Writes an HTML response with the given status code.
    pub fn html<S: AsRef<str>>(&self, status: StatusCode, body: S) -> crate::Result<()> {
        self.write_response(status, constants::CONTENT_TYPE_HTML, body.as_ref().as_bytes())
    }

    /// Writes a raw response with an explicit content type.
    pub fn data(&self, status: StatusCode, content_type: &str, body: &[u8]) -> crate::Result<()> {
        self.write_response(status, content_type, body)
    }

    /// Writes an empty `204 No Content` response.
    pub fn no_content(&self) -> crate::Result<()> {
        if self.inner.writer.written() {
            return Err(Error::ResponseWritten.into());
        }
        self.inner.writer.write_header(StatusCode::NO_CONTENT);
        Ok(())
    }

    /// Writes a redirect response pointing at `location`.
    pub fn redirect(&self, status: StatusCode, location: &str) -> crate::Result<()> {
        if self.inner.writer.written() {
            return Err(Error::ResponseWritten.into());
        }
        self.inner
            .writer
            .set_header(header::LOCATION, HeaderValue::from_str(location)?);
        self.inner.writer.write_header(status);
        Ok(())
    }

    fn write_response(
        &self,
        status: StatusCode,
        content_type: &str,
        body: &[u8],
    ) -> crate::Result<()> {
        if self.inner.writer.written() {
            return Err(Error::ResponseWritten.into());
        }
        self.inner
            .writer
            .set_header(header::CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        self.inner.writer.write_header(status);
        self.inner.writer.write(body);
        Ok(())
    }

    /// Drains the buffered response for this request.
    pub fn take_response(&self) -> Response<Full<Bytes>> {
        self.inner.writer.take_response()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context {{ method: {:?}, path: {:?}, params: {:?} }}",
            self.method(),
            self.path(),
            self.params()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::pool::ContextPool;
    use super::*;
    use http_body_util::Empty;

    fn bound_context(builder: http::request::Builder) -> Context {
        let ctx = ContextPool::new().acquire(4);
        let request = builder.body(Empty::<Bytes>::new()).unwrap();
        ctx.reset(request, None);
        ctx
    }

    #[test]
    fn request_accessors() {
        let ctx = bound_context(
            Request::builder()
                .method(Method::POST)
                .uri("/search?q=hello+world&page=2")
                .header("user-agent", "smoke-test")
                .header("cookie", "session=abc123; theme=dark")
                .header("authorization", "Bearer tok-1"),
        );

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/search");
        assert_eq!(ctx.query("q").as_deref(), Some("hello world"));
        assert_eq!(ctx.query("page").as_deref(), Some("2"));
        assert_eq!(ctx.user_agent().as_deref(), Some("smoke-test"));
        assert_eq!(ctx.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(ctx.cookie("session").as_deref(), Some("abc123"));
        assert_eq!(ctx.bearer_token().as_deref(), Some("tok-1"));
    }

    #[test]
    fn client_ip_prefers_forwarded_headers() {
        let ctx = bound_context(
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", "10.1.2.3, 172.16.0.1"),
        );
        assert_eq!(ctx.client_ip().as_deref(), Some("10.1.2.3"));

        let ctx = bound_context(Request::builder().uri("/").header("x-real-ip", "10.9.9.9"));
        assert_eq!(ctx.client_ip().as_deref(), Some("10.9.9.9"));

        let ctx = ContextPool::new().acquire(0);
        let request = Request::builder()
            .uri("/")
            .body(Empty::<Bytes>::new())
            .unwrap();
        ctx.reset(request, Some("192.168.1.7:40123".parse().unwrap()));
        assert_eq!(ctx.client_ip().as_deref(), Some("192.168.1.7"));
    }

    #[tokio::test]
    async fn body_bytes_is_cached() {
        let ctx = ContextPool::new().acquire(0);
        let request = Request::builder()
            .uri("/")
            .body(Full::new(Bytes::from_static(b"payload")))
            .unwrap();
        ctx.reset(request, None);

        assert_eq!(ctx.body_bytes().await.unwrap(), "payload");
        assert_eq!(ctx.body_bytes().await.unwrap(), "payload");
    }

    #[test]
    fn data_bag_roundtrip() {
        #[derive(Clone, PartialEq, Debug)]
        struct State(u64);

        let ctx = ContextPool::new().acquire(0);
        ctx.set(State(7));
        ctx.set("label".to_string());

        assert_eq!(ctx.get::<State>(), Some(State(7)));
        assert_eq!(ctx.get::<String>().as_deref(), Some("label"));
        assert_eq!(ctx.get::<u32>(), None);
    }

    #[test]
    fn response_helpers_write_exactly_once() {
        let ctx = bound_context(Request::builder().uri("/"));

        ctx.string(StatusCode::OK, "first").unwrap();
        assert!(ctx.string(StatusCode::OK, "second").is_err());

        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            constants::CONTENT_TYPE_TEXT
        );
    }

    #[test]
    fn json_sets_content_type() {
        let ctx = bound_context(Request::builder().uri("/"));
        ctx.json(StatusCode::CREATED, &serde_json::json!({ "ok": true }))
            .unwrap();

        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            constants::CONTENT_TYPE_JSON
        );
    }

    #[test]
    fn redirect_sets_location() {
        let ctx = bound_context(Request::builder().uri("/old"));
        ctx.redirect(StatusCode::MOVED_PERMANENTLY, "/new").unwrap();

        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/new");
    }
}
