use hyper::service::Service;
use hyper::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use routrie::{Context, Middleware, Router, RouterService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

// Rejects requests without a bearer token; applied to the admin group only.
async fn require_token(ctx: Context) -> routrie::Result<()> {
    if ctx.bearer_token().is_none() {
        return ctx.string(StatusCode::UNAUTHORIZED, "token required");
    }
    ctx.next().await
}

fn router() -> Router {
    let mut router = Router::new();

    router.get("/", |ctx: Context| async move {
        ctx.string(StatusCode::OK, "Home page")
    });

    let mut api = router.group("/api");
    api.get("/books", |ctx: Context| async move {
        ctx.string(StatusCode::OK, "List of books")
    });
    api.get("/books/:bookId", |ctx: Context| async move {
        let id = ctx.param("bookId").unwrap_or_default();
        ctx.string(StatusCode::OK, format!("Show book: {}", id))
    });

    // Nested group: /api/admin/..., with its own middleware.
    let mut admin = api.group_with("/admin", vec![Middleware::new(require_token)]);
    admin.delete("/books/:bookId", |ctx: Context| async move {
        ctx.no_content()
    });

    router
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router_service = Arc::new(RouterService::new(router()));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
    let listener = TcpListener::bind(addr).await?;
    println!("App is running on: {}", addr);

    loop {
        let (stream, _) = listener.accept().await?;

        let router_service = router_service.clone();

        tokio::spawn(async move {
            let request_service = router_service.call(&stream).await.unwrap();
            let io = TokioIo::new(stream);
            let builder = Builder::new(TokioExecutor::new());
            if let Err(err) = builder.serve_connection(io, request_service).await {
                eprintln!("Error serving connection: {:?}", err);
            }
        });
    }
}
