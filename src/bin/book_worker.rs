//! `book-worker` — leases chapter tasks and turns them into audio.
use bookcast::config::Config;
use bookcast::db::TaskStore;
use bookcast::error::BookError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "book-worker", version = bookcast::VERSION)]
struct Args;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), BookError> {
    Args::parse();
    let config = Config::from_env()?;
    let store = TaskStore::connect(&config.database).await?;
    store.migrate().await?;

    bookcast::worker::run(config, store, shutdown_signal()).await
}

/// Resolve once SIGINT or (on Unix) SIGTERM is received, so the
/// fetch/process loop gets a chance to finish its current task before
/// the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
