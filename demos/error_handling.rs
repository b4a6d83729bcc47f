use hyper::service::Service;
use hyper::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use routrie::{Context, RouteError, Router, RouterService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

// A handler for "/" page which always fails.
async fn home_handler(_: Context) -> routrie::Result<()> {
    Err(routrie::Error::new("Some errors").into())
}

// A handler for "/about" page.
async fn about_handler(ctx: Context) -> routrie::Result<()> {
    ctx.string(StatusCode::OK, "About page")
}

// The error handler receives the boxed error and generates a response.
async fn error_handler(ctx: Context, err: RouteError) {
    eprintln!("{}", err);
    let _ = ctx.string(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Something went wrong: {}", err),
    );
}

fn router() -> Router {
    let mut router = Router::new();
    router.get("/", home_handler);
    router.get("/about", about_handler);
    // Attach the custom error handler defined above.
    router.set_error_handler(error_handler);
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
