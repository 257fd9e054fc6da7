use std::path::PathBuf;

use clap::Parser;
use tabload_engine::{EngineResult, LoadRequest, LoadResponse, LogBook, NativeDrivers, Pipeline};
use tabload_ingest::{CsvReader, LogPort};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tabload", about = "Load a CSV file into a relational table")]
pub struct Args {
    /// JSON request describing source and destination.
    #[arg(long, env = "TABLOAD_REQUEST", default_value = "mocks/request.json")]
    pub request: PathBuf,

    /// File the run's log lines are appended to.
    #[arg(long, env = "TABLOAD_LOG_FILE", default_value = "logs/app.log")]
    pub log_file: PathBuf,
}

pub fn run() -> EngineResult<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let book = LogBook::new();
    let response = handle_file(&args, &book);

    println!("Final Result: {}", serde_json::to_string(&response)?);
    book.flush_to(&args.log_file)?;
    tracing::info!(log_file = %args.log_file.display(), "log lines flushed");
    Ok(())
}

/// Handles the request file named by `args`, logging into `book`. A request
/// that cannot be loaded becomes a failed response.
pub fn handle_file(args: &Args, book: &LogBook) -> LoadResponse {
    let log = book.port("main");
    let request = match LoadRequest::from_path(&args.request) {
        Ok(request) => request,
        Err(err) => {
            log.error(&format!("Error loading request: {err}"));
            return LoadResponse::Failed {
                error: err.to_string(),
                connection: None,
            };
        }
    };

    let reader = CsvReader::new(book.port("reader"));
    let pipeline = Pipeline::new(&reader, &NativeDrivers, book.port("pipeline"), book.port("sink"));
    pipeline.handle(&request)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
