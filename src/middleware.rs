use crate::context::Context;
use crate::RouteError;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(crate) type HandlerFuture = Pin<Box<dyn Future<Output = crate::Result<()>> + Send + 'static>>;

/// The erased shape shared by route handlers, middleware and the router's
/// 404/405 hooks: an async function over the request [`Context`].
pub(crate) type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync + 'static>;

/// Erases a user-provided handler into the internal [`Handler`] shape,
/// boxing its error type into [`RouteError`].
pub(crate) fn into_handler<H, R, E>(handler: H) -> Handler
where
    H: Fn(Context) -> R + Send + Sync + 'static,
    R: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<RouteError> + 'static,
{
    Arc::new(move |ctx: Context| {
        let fut = handler(ctx);
        Box::pin(async move { fut.await.map_err(Into::into) }) as HandlerFuture
    })
}

/// An interceptor which runs before a route handler and may run code on both
/// sides of the downstream chain.
///
/// A middleware receives the request [`Context`] exactly like a route
/// handler does. Calling [`Context::next`](crate::Context::next) hands
/// control to the next stage (another middleware, or finally the route
/// handler); returning without calling it short-circuits the chain and
/// skips every later stage.
///
/// # Examples
///
/// ```
/// use routrie::{Middleware, Router};
/// use hyper::StatusCode;
///
/// fn router() -> Router {
///     let mut router = Router::new();
///     router.middleware(Middleware::new(|ctx: routrie::Context| async move {
///         if ctx.header("authorization").is_none() {
///             return ctx.string(StatusCode::UNAUTHORIZED, "who are you?");
///         }
///         ctx.next().await
///     }));
///     router.get("/", |ctx: routrie::Context| async move {
///         ctx.string(StatusCode::OK, "hello")
///     });
///     router
/// }
/// # router();
/// ```
#[derive(Clone)]
pub struct Middleware {
    pub(crate) handler: Handler,
}

impl Middleware {
    /// Creates a middleware from an async function over the request context.
    pub fn new<H, R, E>(handler: H) -> Middleware
    where
        H: Fn(Context) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<RouteError> + 'static,
    {
        Middleware {
            handler: into_handler(handler),
        }
    }
}

impl Debug for Middleware {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Middleware {{ }}")
    }
}

/// Folds a middleware list and a terminal handler into a single handler.
///
/// Entering stage `i` installs stage `i + 1` as the context's `next`
/// continuation and then runs the middleware. Any continuation a stage left
/// unconsumed is dropped when the stage returns, so a short-circuiting
/// middleware never leaks its continuation to an outer stage.
pub(crate) fn compose(middleware: &[Middleware], terminal: Handler) -> Handler {
    let mut current = terminal;
    for mw in middleware.iter().rev() {
        let stage = mw.handler.clone();
        let next = current;
        current = Arc::new(move |ctx: Context| {
            let stage = stage.clone();
            let next = next.clone();
            Box::pin(async move {
                ctx.install_next(next);
                let result = stage(ctx.clone()).await;
                ctx.clear_next();
                result
            }) as HandlerFuture
        });
    }
    current
}
