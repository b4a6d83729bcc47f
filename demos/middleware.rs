use hyper::service::Service;
use hyper::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use routrie::{Context, Middleware, Router, RouterService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

// A middleware which logs every request and the status it ended with.
async fn logger(ctx: Context) -> routrie::Result<()> {
    let started = Instant::now();
    let method = ctx.method();
    let path = ctx.path();

    ctx.next().await?;

    println!(
        "{} {} -> {} in {:?}",
        method,
        path,
        ctx.writer().status(),
        started.elapsed()
    );
    Ok(())
}

// A middleware which stamps a header onto every response.
async fn custom_header_adder(ctx: Context) -> routrie::Result<()> {
    ctx.set_header("x-powered-by", "routrie")?;
    ctx.next().await
}

async fn home_handler(ctx: Context) -> routrie::Result<()> {
    ctx.string(StatusCode::OK, "Home page")
}

async fn about_handler(ctx: Context) -> routrie::Result<()> {
    ctx.string(StatusCode::OK, "About page")
}

fn router() -> Router {
    let mut router = Router::new();
    // Default middleware wraps every route registered after it.
    router.middleware(Middleware::new(logger));
    router.middleware(Middleware::new(custom_header_adder));
    router.get("/", home_handler);
    router.get("/about", about_handler);
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
