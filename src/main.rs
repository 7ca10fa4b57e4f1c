use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use gesture_server::{AppState, Args, WorkerPool, load_pipelines, router};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("gesture_server=info")).init();

    // Parse command line arguments and load every model once, before accepting requests.
    let args = Args::parse();
    log::info!(
        "loading models: palm={} landmark={} classifier={}",
        args.palm_model,
        args.landmark_model,
        args.classifier_model
    );
    let pipelines = load_pipelines(&args)?;
    let pool = WorkerPool::new(pipelines);
    log::info!("models and labels loaded, {} worker(s)", pool.size());

    let app = router(AppState::new(pool, args.request_timeout()));
    let addr: SocketAddr = args
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", args.bind_addr()))?;
    log::info!("gesture server listening on {}", addr);

    axum::Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {}", addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}
