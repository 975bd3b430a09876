use std::net::SocketAddr;

use anyhow::Context as _;
use clap::Parser;

use videlina::backend::{self, Backend};
use videlina::web::{self, AppState};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Where catalog data lives.
    #[arg(long, value_enum, default_value_t = Backend::Rest)]
    backend: Backend,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    videlina::logging::init_with_default(videlina::logging::SERVER_FILTER)?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting videlina-app");

    let conn = backend::connect(args.backend)
        .await
        .context("connect backend")?;
    conn.session.refresh().await;

    let app = web::router(AppState::new(conn.library, conn.session));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
