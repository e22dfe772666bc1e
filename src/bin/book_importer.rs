//! `book-importer` — walks a directory of `.txt` book files and
//! imports each one into the task store.
use std::path::PathBuf;

use bookcast::config::Config;
use bookcast::db::TaskStore;
use bookcast::error::BookError;
use bookcast::importer::Importer;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "book-importer", version = bookcast::VERSION)]
struct Args {
    /// Directory to recursively scan for `.txt` book files.
    root_dir: PathBuf,

    /// Import at most this many files (useful for smoke-testing a
    /// large corpus before committing to a full run).
    #[arg(long)]
    limit: Option<usize>,
}

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
    let args = Args::parse();
    let config = Config::from_env()?;
    let store = TaskStore::connect(&config.database).await?;
    store.migrate().await?;
    let importer = Importer::new(&store);

    let mut imported = 0usize;
    let mut failed = 0usize;
    for entry in WalkDir::new(&args.root_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
    {
        if args.limit.is_some_and(|limit| imported + failed >= limit) {
            break;
        }
        match importer.import_file(entry.path()).await {
            Ok(book_id) => {
                imported += 1;
                tracing::info!(path = %entry.path().display(), book_id, "imported");
            }
            Err(err) => {
                failed += 1;
                tracing::error!(path = %entry.path().display(), error = %err, "import failed");
            }
        }
    }

    tracing::info!(imported, failed, "import run finished");
    Ok(())
}
