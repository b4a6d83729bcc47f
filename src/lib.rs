//! `routrie` is a lightweight, composable HTTP request router for the Rust
//! HTTP library [hyper](https://hyper.rs/), built around a compressed radix
//! tree.
//!
//! Core features:
//!
//! - 🌲 Fast route matching on a per-method radix tree with `:param` and
//!   `*catch_all` captures — no per-route scanning, lookup cost grows with
//!   the path, not the route table
//! - 🧅 `next()`-style middleware which can run code before and after the
//!   rest of the chain, and short-circuit it entirely
//! - 🗂 Route groups with shared prefixes and middleware lists
//! - ♻️ Pooled per-request contexts carrying captured parameters, request
//!   accessors and a buffered response writer
//! - ❗ A pluggable error handler plus customizable `404`/`405` responses
//!   (with an `Allow` header listing the methods that would have matched)
//!
//! ## Basic Example
//!
//! A simple server app using `routrie` with `hyper` looks like the
//! following:
//!
//! ```no_run
//! use hyper::service::Service;
//! use hyper::StatusCode;
//! use hyper_util::rt::{TokioExecutor, TokioIo};
//! use hyper_util::server::conn::auto::Builder;
//! use routrie::{Context, Middleware, Router, RouterService};
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! // A handler for "/" page.
//! async fn home_handler(ctx: Context) -> routrie::Result<()> {
//!     ctx.string(StatusCode::OK, "Home page")
//! }
//!
//! // A handler for "/users/:userId" page.
//! async fn user_handler(ctx: Context) -> routrie::Result<()> {
//!     let user_id = ctx.param("userId").unwrap_or_default();
//!     ctx.string(StatusCode::OK, format!("Hello {}", user_id))
//! }
//!
//! // A middleware which logs every request before passing it on.
//! async fn logger(ctx: Context) -> routrie::Result<()> {
//!     println!("{} {}", ctx.method(), ctx.path());
//!     ctx.next().await
//! }
//!
//! fn router() -> Router {
//!     let mut router = Router::new();
//!     router.middleware(Middleware::new(logger));
//!     router.get("/", home_handler);
//!     router.get("/users/:userId", user_handler);
//!     router
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Sealing the router into a service ends the registration phase.
//!     let router_service = Arc::new(RouterService::new(router()));
//!
//!     let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
//!     let listener = TcpListener::bind(addr).await?;
//!     println!("App is running on: {}", addr);
//!
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let router_service = router_service.clone();
//!
//!         tokio::spawn(async move {
//!             let request_service = router_service.call(&stream).await.unwrap();
//!             let io = TokioIo::new(stream);
//!             let builder = Builder::new(TokioExecutor::new());
//!             if let Err(err) = builder.serve_connection(io, request_service).await {
//!                 eprintln!("Error serving connection: {:?}", err);
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! ## Routing
//!
//! ### Route Handlers
//!
//! A handler is an async function or closure taking the request [`Context`]
//! and returning `Result<(), E>` for any error type convertible into
//! [`RouteError`]:
//!
//! ```
//! use hyper::StatusCode;
//! use routrie::{Context, Router};
//!
//! async fn about_handler(ctx: Context) -> routrie::Result<()> {
//!     ctx.string(StatusCode::OK, "About page")
//! }
//!
//! # fn run() -> Router {
//! let mut router = Router::new();
//! router.get("/about", about_handler);
//! # router
//! # }
//! # run();
//! ```
//!
//! ### Route Patterns
//!
//! Patterns are slash-delimited and must begin with `/`. Three segment
//! kinds exist:
//!
//! - **static** segments match their literal text;
//! - `:name` matches exactly one non-empty path segment and captures it;
//! - `*name` matches the whole remainder of the path — including its
//!   leading slash — and may only appear as the final segment.
//!
//! ```txt
//! Pattern: /users/:userName/books/:bookName
//! Request: /users/alice/books/HarryPotter
//! Params:  { "userName": "alice", "bookName": "HarryPotter" }
//!
//! Pattern: /static/*filepath
//! Request: /static/css/main.css
//! Params:  { "filepath": "/css/main.css" }
//! ```
//!
//! At any tree position a wildcard and a static segment are mutually
//! exclusive: registering `/users/profile` and `/users/:id` together is a
//! conflict and panics at registration time, which keeps every match
//! unambiguous. `/users` and `/users/` are distinct routes; opt into
//! [`Router::redirect_trailing_slash`] to answer a near-miss with a
//! redirect instead of a `404`.
//!
//! ### Route Groups
//!
//! Groups scope a path prefix and a middleware list over many routes, and
//! nest:
//!
//! ```
//! use hyper::StatusCode;
//! use routrie::{Context, Router};
//!
//! # fn run() -> Router {
//! let mut router = Router::new();
//! let mut api = router.group("/api");
//! api.get("/books", |ctx: Context| async move {
//!     ctx.string(StatusCode::OK, "List of books")
//! });
//! api.get("/books/:bookId", |ctx: Context| async move {
//!     let id = ctx.param("bookId").unwrap_or_default();
//!     ctx.string(StatusCode::OK, format!("Show book: {}", id))
//! });
//! # router
//! # }
//! # run();
//! ```
//!
//! ## Middleware
//!
//! A [`Middleware`] is a handler which may run code before handing control
//! to the rest of the chain with [`Context::next`], and again after it
//! returns. Returning without calling `next()` cancels the chain: later
//! middleware and the route handler are skipped.
//!
//! ```
//! use hyper::StatusCode;
//! use routrie::{Context, Middleware, Router};
//!
//! # fn run() -> Router {
//! let mut router = Router::new();
//! router.middleware(Middleware::new(|ctx: Context| async move {
//!     if ctx.bearer_token().is_none() {
//!         // short-circuit: nothing downstream runs
//!         return ctx.string(StatusCode::UNAUTHORIZED, "token required");
//!     }
//!     ctx.next().await
//! }));
//! router.get("/private", |ctx: Context| async move {
//!     ctx.string(StatusCode::OK, "secret")
//! });
//! # router
//! # }
//! # run();
//! ```
//!
//! Middleware added with [`Router::middleware`] applies to every route
//! registered *afterwards*; per-route middleware goes through
//! [`Router::handle_with`] or a group.
//!
//! ## Sharing request-scoped data
//!
//! Stages of one request share data through the context's typed bag:
//!
//! ```
//! use hyper::StatusCode;
//! use routrie::{Context, Middleware, Router};
//!
//! #[derive(Clone)]
//! struct RequestId(u64);
//!
//! # fn run() -> Router {
//! let mut router = Router::new();
//! router.middleware(Middleware::new(|ctx: Context| async move {
//!     ctx.set(RequestId(42));
//!     ctx.next().await
//! }));
//! router.get("/", |ctx: Context| async move {
//!     let id = ctx.get::<RequestId>().map(|r| r.0).unwrap_or(0);
//!     ctx.string(StatusCode::OK, format!("request {}", id))
//! });
//! # router
//! # }
//! # run();
//! ```
//!
//! ## Error Handling
//!
//! Handlers and middleware may return any error type; it is boxed into
//! [`RouteError`] and handed to the router's error handler, which defaults
//! to logging the error and answering `500 Internal Server Error`:
//!
//! ```
//! use hyper::StatusCode;
//! use routrie::{Context, RouteError, Router};
//!
//! # fn run() -> Router {
//! let mut router = Router::new();
//! router.set_error_handler(|ctx: Context, err: RouteError| async move {
//!     let _ = ctx.string(
//!         StatusCode::INTERNAL_SERVER_ERROR,
//!         format!("Something went wrong: {}", err),
//!     );
//! });
//! router.get("/flaky", |_: Context| async move {
//!     Err::<(), RouteError>(routrie::Error::new("boom").into())
//! });
//! # router
//! # }
//! # run();
//! ```
//!
//! The `404` and `405` responses are customizable the same way through
//! [`Router::set_not_found_handler`] and
//! [`Router::set_method_not_allowed_handler`].
//!
//! ## Registration and serving phases
//!
//! Registration is single-threaded initialization: every registration
//! method takes `&mut Router`, and building a [`RouterService`] (or a
//! [`RequestServiceBuilder`]) consumes the router into an `Arc`. From that
//! point on the route trees are immutable and dispatch reads them without
//! any locking; registering routes after serving has begun is not
//! representable.

pub use self::context::{Context, Writer};
pub use self::error::{Error, RouteError};
pub use self::group::Group;
pub use self::middleware::Middleware;
pub use self::router::{Route, RouteInfo, Router};
pub use self::service::{RequestService, RequestServiceBuilder, RouterService};
pub use self::types::RouteParams;

mod constants;
mod context;
mod error;
mod group;
mod helpers;
mod middleware;
mod router;
mod service;
mod tree;
mod types;

/// A Result type often returned from methods that can have routrie errors.
pub type Result<T> = std::result::Result<T, RouteError>;
