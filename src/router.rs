use crate::constants;
use crate::context::{Context, ErrorHandler, ErrorHandlerFuture};
use crate::context::pool::ContextPool;
use crate::group::Group;
use crate::middleware::{compose, into_handler, Handler, Middleware};
use crate::tree::{Lookup, Node};
use crate::RouteError;
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

/// The HTTP request router.
///
/// A router holds one radix tree per HTTP method. Registering a route
/// composes its middleware chain into a single handler and inserts it into
/// the method's tree; dispatching a request walks the tree, binds the
/// captured parameters into the request [`Context`] and runs the handler.
/// A path registered under a different method yields `405 Method Not
/// Allowed` (with an `Allow` header naming the methods that do match), an
/// unknown path yields `404 Not Found`.
///
/// Registration is a single-threaded initialization phase: every
/// registration method takes `&mut self`, and handing the router to
/// [`RequestServiceBuilder`](crate::RequestServiceBuilder) seals it behind
/// an `Arc`, after which the trees are read-only and dispatch runs without
/// locks.
///
/// Malformed patterns, duplicate routes and wildcard conflicts are
/// programmer errors and panic at registration time.
///
/// # Examples
///
/// ```
/// use hyper::StatusCode;
/// use routrie::{Context, Router};
///
/// let mut router = Router::new();
/// router.get("/", |ctx: Context| async move {
///     ctx.string(StatusCode::OK, "home")
/// });
/// router.get("/users/:id", |ctx: Context| async move {
///     let id = ctx.param("id").unwrap_or_default();
///     ctx.json(StatusCode::OK, &serde_json::json!({ "user": id }))
/// });
/// ```
pub struct Router {
    trees: HashMap<Method, Node>,
    routes: Vec<RouteInfo>,
    named_routes: HashMap<String, usize>,
    default_middleware: Vec<Middleware>,
    not_found: Handler,
    method_not_allowed: Handler,
    error_handler: ErrorHandler,
    redirect_trailing_slash: bool,
    pool: ContextPool,
}

/// Metadata recorded for every registered route.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub method: Method,
    pub pattern: String,
    pub name: Option<String>,
}

/// A guard over a freshly registered route, used to attach metadata.
pub struct Route<'r> {
    router: &'r mut Router,
    index: usize,
}

impl Route<'_> {
    /// Names the route. Names map uniquely onto routes; reusing a name
    /// rebinds it.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        let name = name.into();
        self.router.routes[self.index].name = Some(name.clone());
        self.router.named_routes.insert(name, self.index);
        self
    }
}

impl Default for Router {
    fn default() -> Router {
        Router::new()
    }
}

macro_rules! method_shortcut {
    ($(#[$doc:meta])* $fn_name:ident, $method:ident) => {
        $(#[$doc])*
        pub fn $fn_name<H, R, E>(&mut self, pattern: &str, handler: H) -> Route<'_>
        where
            H: Fn(Context) -> R + Send + Sync + 'static,
            R: Future<Output = Result<(), E>> + Send + 'static,
            E: Into<RouteError> + 'static,
        {
            self.handle(Method::$method, pattern, handler)
        }
    };
}

impl Router {
    /// Creates an empty router with the default 404/405/error responders.
    pub fn new() -> Router {
        Router {
            trees: HashMap::new(),
            routes: Vec::new(),
            named_routes: HashMap::new(),
            default_middleware: Vec::new(),
            not_found: into_handler(|ctx: Context| async move {
                ctx.string(StatusCode::NOT_FOUND, constants::NOT_FOUND_BODY)
            }),
            method_not_allowed: into_handler(|ctx: Context| async move {
                ctx.string(
                    StatusCode::METHOD_NOT_ALLOWED,
                    constants::METHOD_NOT_ALLOWED_BODY,
                )
            }),
            error_handler: Arc::new(|ctx: Context, err: RouteError| {
                Box::pin(async move {
                    tracing::error!(error = %err, "handler returned an error");
                    let _ = ctx.string(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        constants::INTERNAL_SERVER_ERROR_BODY,
                    );
                }) as ErrorHandlerFuture
            }),
            redirect_trailing_slash: false,
            pool: ContextPool::new(),
        }
    }

    /// Registers a handler for `pattern` under the given method.
    pub fn handle<H, R, E>(&mut self, method: Method, pattern: &str, handler: H) -> Route<'_>
    where
        H: Fn(Context) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<RouteError> + 'static,
    {
        self.handle_with(method, pattern, handler, Vec::new())
    }

    /// Registers a handler with route-specific middleware, run after any
    /// default middleware installed via [`middleware`](Router::middleware).
    pub fn handle_with<H, R, E>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        middleware: Vec<Middleware>,
    ) -> Route<'_>
    where
        H: Fn(Context) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<RouteError> + 'static,
    {
        let index = self.register(method, pattern, into_handler(handler), middleware);
        Route {
            router: self,
            index,
        }
    }

    method_shortcut!(
        /// Registers a handler for `GET` requests at `pattern`.
        get, GET
    );
    method_shortcut!(
        /// Registers a handler for `POST` requests at `pattern`.
        post, POST
    );
    method_shortcut!(
        /// Registers a handler for `PUT` requests at `pattern`.
        put, PUT
    );
    method_shortcut!(
        /// Registers a handler for `PATCH` requests at `pattern`.
        patch, PATCH
    );
    method_shortcut!(
        /// Registers a handler for `DELETE` requests at `pattern`.
        delete, DELETE
    );
    method_shortcut!(
        /// Registers a handler for `HEAD` requests at `pattern`.
        head, HEAD
    );
    method_shortcut!(
        /// Registers a handler for `OPTIONS` requests at `pattern`.
        options, OPTIONS
    );

    /// Appends a middleware to the default list applied to every route
    /// registered afterwards. Routes registered before this call are not
    /// affected.
    pub fn middleware(&mut self, middleware: Middleware) {
        self.default_middleware.push(middleware);
    }

    /// Returns a registration scope which prefixes every route with
    /// `prefix`.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        self.group_with(prefix, Vec::new())
    }

    /// Returns a registration scope with a shared prefix and middleware
    /// list.
    pub fn group_with(&mut self, prefix: &str, middleware: Vec<Middleware>) -> Group<'_> {
        Group::new(self, prefix, middleware)
    }

    /// Replaces the handler run when no route matches the request path.
    pub fn set_not_found_handler<H, R, E>(&mut self, handler: H)
    where
        H: Fn(Context) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<RouteError> + 'static,
    {
        self.not_found = into_handler(handler);
    }

    /// Replaces the handler run when the path exists under another method.
    pub fn set_method_not_allowed_handler<H, R, E>(&mut self, handler: H)
    where
        H: Fn(Context) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<RouteError> + 'static,
    {
        self.method_not_allowed = into_handler(handler);
    }

    /// Replaces the handler consulted when a route or middleware returns an
    /// error.
    pub fn set_error_handler<H, R>(&mut self, handler: H)
    where
        H: Fn(Context, RouteError) -> R + Send + Sync + 'static,
        R: Future<Output = ()> + Send + 'static,
    {
        self.error_handler = Arc::new(move |ctx, err| {
            Box::pin(handler(ctx, err)) as ErrorHandlerFuture
        });
    }

    /// Enables answering a near-miss with a redirect to the same path with
    /// its trailing slash toggled (`301` for `GET`, `308` otherwise).
    /// Disabled by default: `/users` and `/users/` are distinct routes.
    pub fn redirect_trailing_slash(&mut self, enabled: bool) {
        self.redirect_trailing_slash = enabled;
    }

    /// Returns the metadata of every registered route, in registration
    /// order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Returns the metadata of the route registered under `name`.
    pub fn route(&self, name: &str) -> Option<&RouteInfo> {
        self.named_routes
            .get(name)
            .and_then(|&index| self.routes.get(index))
    }

    fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
        route_middleware: Vec<Middleware>,
    ) -> usize {
        if !pattern.starts_with('/') {
            panic!("path must begin with '/' in path {:?}", pattern);
        }

        let mut chain = self.default_middleware.clone();
        chain.extend(route_middleware);
        let composed = compose(&chain, handler);

        let tree = self.trees.entry(method.clone()).or_default();
        tree.insert(pattern, composed);

        tracing::debug!(method = %method, pattern, "registered route");

        self.routes.push(RouteInfo {
            method,
            pattern: pattern.to_string(),
            name: None,
        });
        self.routes.len() - 1
    }

    /// Acquires a pooled request context, pre-sized for the largest
    /// parameter count any registered route can capture.
    pub fn acquire_context(&self) -> Context {
        let max_params = self
            .trees
            .values()
            .map(|tree| tree.max_params() as usize)
            .max()
            .unwrap_or(0);
        let ctx = self.pool.acquire(max_params);
        ctx.set_error_handler(self.error_handler.clone());
        ctx
    }

    /// Clears a context and returns it to the pool.
    pub fn release_context(&self, ctx: Context) {
        self.pool.release(ctx);
    }

    /// Maps `(method, path)` onto a handler and runs it.
    ///
    /// `path` must already be percent-decoded. The matched route's
    /// parameters are bound into `ctx` before its handler runs; an error
    /// returned by the handler is routed into the error handler. A miss
    /// produces a 404 or 405 response through the corresponding hook.
    pub async fn dispatch(&self, method: &Method, path: &str, ctx: &Context) {
        if let Some(tree) = self.trees.get(method) {
            match tree.lookup(path) {
                Lookup::Found { handler, params } => {
                    ctx.set_params(params);
                    if let Err(err) = handler(ctx.clone()).await {
                        self.handle_error(ctx, err).await;
                    }
                    return;
                }
                Lookup::Miss { tsr } => {
                    if tsr && self.redirect_trailing_slash {
                        if self.send_trailing_slash_redirect(method, path, ctx) {
                            return;
                        }
                    }
                }
            }
        }

        // the path may exist under other methods
        let mut allowed: Vec<&str> = self
            .trees
            .iter()
            .filter(|(m, _)| *m != method)
            .filter(|(_, tree)| matches!(tree.lookup(path), Lookup::Found { .. }))
            .map(|(m, _)| m.as_str())
            .collect();

        if !allowed.is_empty() {
            allowed.sort_unstable();
            if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                ctx.writer().set_header(header::ALLOW, value);
            }
            tracing::debug!(method = %method, path, "method not allowed");
            let handler = self.method_not_allowed.clone();
            if let Err(err) = handler(ctx.clone()).await {
                self.handle_error(ctx, err).await;
            }
            return;
        }

        tracing::debug!(method = %method, path, "no route matched");
        let handler = self.not_found.clone();
        if let Err(err) = handler(ctx.clone()).await {
            self.handle_error(ctx, err).await;
        }
    }

    fn send_trailing_slash_redirect(&self, method: &Method, path: &str, ctx: &Context) -> bool {
        let location = match path.strip_suffix('/') {
            Some(stripped) => stripped.to_string(),
            None => format!("{}/", path),
        };
        if location.is_empty() {
            return false;
        }
        let status = if method == Method::GET {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::PERMANENT_REDIRECT
        };
        ctx.redirect(status, &location).is_ok()
    }

    async fn handle_error(&self, ctx: &Context, err: RouteError) {
        let handler = ctx
            .error_handler()
            .unwrap_or_else(|| self.error_handler.clone());
        handler(ctx.clone(), err).await;
    }
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.trees.keys().collect::<Vec<_>>())
            .field("routes", &self.routes)
            .field("default_middleware", &self.default_middleware.len())
            .field("redirect_trailing_slash", &self.redirect_trailing_slash)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::HeaderMap;
    use http::Request;
    use http_body_util::{BodyExt, Full};

    async fn send(router: &Router, method: Method, path: &str) -> (StatusCode, HeaderMap, String) {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap();
        send_request(router, request).await
    }

    async fn send_request(
        router: &Router,
        request: Request<Full<Bytes>>,
    ) -> (StatusCode, HeaderMap, String) {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let ctx = router.acquire_context();
        ctx.reset(request, None);
        router.dispatch(&method, &path, &ctx).await;
        let response = ctx.take_response();
        router.release_context(ctx);

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn routes_the_root_path() {
        let mut router = Router::new();
        router.get("/", |ctx: Context| async move {
            assert!(ctx.params().is_empty());
            ctx.string(StatusCode::OK, "root")
        });

        let (status, _, body) = send(&router, Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "root");
    }

    #[tokio::test]
    async fn binds_route_parameters() {
        let mut router = Router::new();
        router.get("/users/:id", |ctx: Context| async move {
            let id = ctx.param("id").unwrap_or_default();
            ctx.string(StatusCode::OK, id)
        });

        let (status, _, body) = send(&router, Method::GET, "/users/123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "123");
    }

    #[tokio::test]
    async fn binds_catch_all_parameters() {
        let mut router = Router::new();
        router.get("/static/*filepath", |ctx: Context| async move {
            let filepath = ctx.param("filepath").unwrap_or_default();
            ctx.string(StatusCode::OK, filepath)
        });

        let (status, _, body) = send(&router, Method::GET, "/static/css/main.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/css/main.css");
    }

    #[tokio::test]
    async fn echoes_multiple_parameters() {
        let mut router = Router::new();
        router.get("/a/:b/c/:d", |ctx: Context| async move {
            let b = ctx.param("b").unwrap_or_default();
            let d = ctx.param("d").unwrap_or_default();
            ctx.string(StatusCode::OK, format!("{}-{}", b, d))
        });

        let (status, _, body) = send(&router, Method::GET, "/a/1/c/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1-2");
    }

    #[tokio::test]
    async fn answers_405_with_allow_header() {
        let mut router = Router::new();
        router.get("/exists", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "ok")
        });
        router.put("/exists", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "ok")
        });

        let (status, headers, body) = send(&router, Method::POST, "/exists").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "Method Not Allowed");
        assert_eq!(headers.get(header::ALLOW).unwrap(), "GET, PUT");
    }

    #[tokio::test]
    async fn answers_404_for_unknown_paths() {
        let mut router = Router::new();
        router.get("/exists", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "ok")
        });

        let (status, _, body) = send(&router, Method::GET, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not Found");
    }

    #[tokio::test]
    async fn middleware_runs_around_the_handler() {
        let mut router = Router::new();
        let order = |tag: &'static str| {
            Middleware::new(move |ctx: Context| async move {
                let seen = ctx.response_header("x-order").unwrap_or_default();
                ctx.set_header("x-order", &format!("{}{}", seen, tag))?;
                ctx.next().await?;
                let seen = ctx.response_header("x-order").unwrap_or_default();
                ctx.set_header("x-order", &format!("{}{}'", seen, tag))
            })
        };
        router.middleware(order("1"));
        router.middleware(order("2"));
        router.get("/t", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "t")
        });

        let (status, headers, _) = send(&router, Method::GET, "/t").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get("x-order").unwrap(), "122'1'");
    }

    #[tokio::test]
    async fn default_middleware_only_wraps_later_routes() {
        let mut router = Router::new();
        router.get("/before", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "before")
        });
        router.middleware(Middleware::new(|ctx: Context| async move {
            ctx.set_header("x-tagged", "yes")?;
            ctx.next().await
        }));
        router.get("/after", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "after")
        });

        let (_, headers, _) = send(&router, Method::GET, "/before").await;
        assert!(headers.get("x-tagged").is_none());

        let (_, headers, _) = send(&router, Method::GET, "/after").await;
        assert_eq!(headers.get("x-tagged").unwrap(), "yes");
    }

    #[tokio::test]
    async fn short_circuiting_middleware_skips_the_handler() {
        let mut router = Router::new();
        router.middleware(Middleware::new(|ctx: Context| async move {
            ctx.string(StatusCode::UNAUTHORIZED, "denied")
        }));
        router.get("/secret", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "secret")
        });

        let (status, _, body) = send(&router, Method::GET, "/secret").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "denied");
    }

    #[tokio::test]
    async fn handler_errors_reach_the_default_error_handler() {
        let mut router = Router::new();
        router.get("/fail", |_: Context| async move {
            Err::<(), RouteError>(crate::Error::new("boom").into())
        });

        let (status, _, body) = send(&router, Method::GET, "/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal Server Error");
    }

    #[tokio::test]
    async fn custom_error_handler_sees_the_error() {
        let mut router = Router::new();
        router.set_error_handler(|ctx: Context, err: RouteError| async move {
            let _ = ctx.string(StatusCode::BAD_GATEWAY, format!("caught: {}", err));
        });
        router.get("/fail", |_: Context| async move {
            Err::<(), RouteError>(crate::Error::new("boom").into())
        });

        let (status, _, body) = send(&router, Method::GET, "/fail").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, "caught: boom");
    }

    #[tokio::test]
    async fn custom_not_found_and_method_not_allowed() {
        let mut router = Router::new();
        router.set_not_found_handler(|ctx: Context| async move {
            ctx.string(StatusCode::NOT_FOUND, "nothing here")
        });
        router.set_method_not_allowed_handler(|ctx: Context| async move {
            ctx.string(StatusCode::METHOD_NOT_ALLOWED, "try another verb")
        });
        router.get("/exists", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "ok")
        });

        let (_, _, body) = send(&router, Method::GET, "/missing").await;
        assert_eq!(body, "nothing here");

        let (_, _, body) = send(&router, Method::DELETE, "/exists").await;
        assert_eq!(body, "try another verb");
    }

    #[tokio::test]
    async fn trailing_slash_routes_stay_distinct_by_default() {
        let mut router = Router::new();
        router.get("/users", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "bare")
        });

        let (status, _, _) = send(&router, Method::GET, "/users/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn opt_in_trailing_slash_redirect() {
        let mut router = Router::new();
        router.redirect_trailing_slash(true);
        router.get("/users", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "bare")
        });
        router.post("/submit", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "posted")
        });

        let (status, headers, _) = send(&router, Method::GET, "/users/").await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(headers.get(header::LOCATION).unwrap(), "/users");

        let (status, headers, _) = send(&router, Method::POST, "/submit/").await;
        assert_eq!(status, StatusCode::PERMANENT_REDIRECT);
        assert_eq!(headers.get(header::LOCATION).unwrap(), "/submit");
    }

    #[tokio::test]
    async fn handle_with_appends_route_middleware() {
        let mut router = Router::new();
        router.middleware(Middleware::new(|ctx: Context| async move {
            ctx.add_header("x-chain", "default")?;
            ctx.next().await
        }));
        router.handle_with(
            Method::GET,
            "/wrapped",
            |ctx: Context| async move { ctx.string(StatusCode::OK, "wrapped") },
            vec![Middleware::new(|ctx: Context| async move {
                ctx.add_header("x-chain", "route")?;
                ctx.next().await
            })],
        );

        let (_, headers, _) = send(&router, Method::GET, "/wrapped").await;
        let chain: Vec<_> = headers.get_all("x-chain").iter().collect();
        assert_eq!(chain, ["default", "route"]);
    }

    #[tokio::test]
    async fn named_routes_are_recorded() {
        let mut router = Router::new();
        router
            .get("/users/:id", |ctx: Context| async move {
                ctx.string(StatusCode::OK, "user")
            })
            .name("users.show");

        let info = router.route("users.show").expect("route should be named");
        assert_eq!(info.method, Method::GET);
        assert_eq!(info.pattern, "/users/:id");
        assert_eq!(router.routes().len(), 1);
    }

    #[test]
    #[should_panic(expected = "must begin with '/'")]
    fn pattern_without_leading_slash_panics() {
        let mut router = Router::new();
        router.get("users", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "users")
        });
    }

    #[test]
    #[should_panic(expected = "conflicts")]
    fn static_and_parameter_at_same_position_panics() {
        let mut router = Router::new();
        router.get("/users/profile", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "profile")
        });
        router.get("/users/:id", |ctx: Context| async move {
            ctx.string(StatusCode::OK, "user")
        });
    }
}
