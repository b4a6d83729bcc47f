use crate::context::Context;
use crate::middleware::Middleware;
use crate::router::{Route, Router};
use crate::RouteError;
use http::Method;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;

/// A registration scope which prefixes every route and threads a shared
/// middleware list in front of each route's own.
///
/// A group is registration-time bookkeeping only: every call forwards to
/// the [`Router`] with the concatenated prefix and middleware, and nothing
/// of the group survives into dispatch. The group borrows the router, so it
/// cannot outlive it.
///
/// # Examples
///
/// ```
/// use hyper::StatusCode;
/// use routrie::{Context, Middleware, Router};
///
/// let mut router = Router::new();
/// let mut api = router.group_with(
///     "/api",
///     vec![Middleware::new(|ctx: Context| async move {
///         ctx.set_header("x-api-version", "1")?;
///         ctx.next().await
///     })],
/// );
/// api.get("/books", |ctx: Context| async move {
///     ctx.string(StatusCode::OK, "list of books")
/// });
///
/// let mut admin = api.group("/admin");
/// admin.get("/stats", |ctx: Context| async move {
///     ctx.string(StatusCode::OK, "stats")
/// });
/// // registered as /api/books and /api/admin/stats
/// ```
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
    middleware: Vec<Middleware>,
}

macro_rules! group_method_shortcut {
    ($(#[$doc:meta])* $fn_name:ident, $method:ident) => {
        $(#[$doc])*
        pub fn $fn_name<H, R, E>(&mut self, path: &str, handler: H) -> Route<'_>
        where
            H: Fn(Context) -> R + Send + Sync + 'static,
            R: Future<Output = Result<(), E>> + Send + 'static,
            E: Into<RouteError> + 'static,
        {
            self.handle(Method::$method, path, handler)
        }
    };
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: &str, middleware: Vec<Middleware>) -> Group<'r> {
        Group {
            router,
            prefix: prefix.to_string(),
            middleware,
        }
    }

    /// Returns a child group with the concatenated prefix and middleware
    /// list.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        self.group_with(prefix, Vec::new())
    }

    /// Returns a child group, appending `middleware` to this group's list.
    pub fn group_with(&mut self, prefix: &str, middleware: Vec<Middleware>) -> Group<'_> {
        let mut combined = self.middleware.clone();
        combined.extend(middleware);
        Group {
            router: &mut *self.router,
            prefix: format!("{}{}", self.prefix, prefix),
            middleware: combined,
        }
    }

    /// Appends a middleware to this group's list, affecting routes
    /// registered through the group afterwards.
    pub fn middleware(&mut self, middleware: Middleware) {
        self.middleware.push(middleware);
    }

    /// Registers a handler for `prefix + path` under the given method.
    pub fn handle<H, R, E>(&mut self, method: Method, path: &str, handler: H) -> Route<'_>
    where
        H: Fn(Context) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<RouteError> + 'static,
    {
        self.handle_with(method, path, handler, Vec::new())
    }

    /// Registers a handler with extra route-specific middleware, run after
    /// the group's own.
    pub fn handle_with<H, R, E>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
        middleware: Vec<Middleware>,
    ) -> Route<'_>
    where
        H: Fn(Context) -> R + Send + Sync + 'static,
        R: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<RouteError> + 'static,
    {
        let mut combined = self.middleware.clone();
        combined.extend(middleware);
        let full_path = format!("{}{}", self.prefix, path);
        self.router.handle_with(method, &full_path, handler, combined)
    }

    group_method_shortcut!(
        /// Registers a handler for `GET` requests at `prefix + path`.
        get, GET
    );
    group_method_shortcut!(
        /// Registers a handler for `POST` requests at `prefix + path`.
        post, POST
    );
    group_method_shortcut!(
        /// Registers a handler for `PUT` requests at `prefix + path`.
        put, PUT
    );
    group_method_shortcut!(
        /// Registers a handler for `PATCH` requests at `prefix + path`.
        patch, PATCH
    );
    group_method_shortcut!(
        /// Registers a handler for `DELETE` requests at `prefix + path`.
        delete, DELETE
    );
    group_method_shortcut!(
        /// Registers a handler for `HEAD` requests at `prefix + path`.
        head, HEAD
    );
    group_method_shortcut!(
        /// Registers a handler for `OPTIONS` requests at `prefix + path`.
        options, OPTIONS
    );
}

impl Debug for Group<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Group {{ prefix: {:?}, middleware: {} }}",
            self.prefix,
            self.middleware.len()
        )
    }
}
