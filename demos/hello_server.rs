use hyper::service::Service;
use hyper::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use routrie::{Context, Router, RouterService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

// A handler for "/" page.
async fn home_handler(ctx: Context) -> routrie::Result<()> {
    ctx.json(
        StatusCode::OK,
        &serde_json::json!({ "message": "Hello!", "version": "1.0.0" }),
    )
}

// A handler for "/users/:id" page.
async fn user_handler(ctx: Context) -> routrie::Result<()> {
    let id = ctx.param("id").unwrap_or_default();
    ctx.json(StatusCode::OK, &serde_json::json!({ "user_id": id }))
}

// A handler serving everything below "/static/".
async fn static_handler(ctx: Context) -> routrie::Result<()> {
    let filepath = ctx.param("filepath").unwrap_or_default();
    ctx.json(StatusCode::OK, &serde_json::json!({ "filepath": filepath }))
}

fn router() -> Router {
    let mut router = Router::new();
    router.get("/", home_handler);
    router.get("/users/:id", user_handler);
    router.get("/static/*filepath", static_handler);
    router
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router_service = Arc::new(RouterService::new(router()));

    // The address on which the server will be listening.
    let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
    let listener = TcpListener::bind(addr).await?;
    println!("App is running on: {}", addr);

    loop {
        let (stream, _) = listener.accept().await?;

        let router_service = router_service.clone();

        tokio::spawn(async move {
            // Get the request service for this connection
            let request_service = router_service.call(&stream).await.unwrap();

            // Wrap the stream in TokioIo for hyper
            let io = TokioIo::new(stream);

            // Serve the connection
            let builder = Builder::new(TokioExecutor::new());
            if let Err(err) = builder.serve_connection(io, request_service).await {
                eprintln!("Error serving connection: {:?}", err);
            }
        });
    }
}
