use clap::Parser;
use loyalty_ledger::application::ingestion::IngestionService;
use loyalty_ledger::application::notifications::TemplateDispatcher;
use loyalty_ledger::config::ProgramSettings;
use loyalty_ledger::domain::ports::{DispatcherHandle, LedgerStoreHandle};
use loyalty_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use loyalty_ledger::infrastructure::log_sink::LogSink;
#[cfg(feature = "storage-rocksdb")]
use loyalty_ledger::infrastructure::rocksdb::RocksDBStore;
use loyalty_ledger::interfaces::csv::customer_writer::CustomerWriter;
use loyalty_ledger::interfaces::csv::event_reader::EventReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input platform events CSV file
    input: PathBuf,

    /// Program settings JSON file (store name, points rate, rewards, templates)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreHandle> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => ProgramSettings::load(path).into_diagnostic()?,
        None => ProgramSettings::default(),
    };
    let store = open_store(cli.db_path)?;
    let dispatcher: DispatcherHandle = Arc::new(TemplateDispatcher::new(
        settings.template_table().into_diagnostic()?,
        settings.store_name.clone(),
        Box::new(LogSink),
    ));

    let service = IngestionService::new(store.clone(), dispatcher, settings);
    service.seed_rewards().await.into_diagnostic()?;

    // Process events
    let file = File::open(cli.input).into_diagnostic()?;
    for event in EventReader::new(file).events() {
        match event {
            Ok(event) => {
                let event_id = event.event_id().to_string();
                match service.handle(event).await {
                    Ok(outcome) => debug!(%event_id, ?outcome, "event processed"),
                    Err(e) => error!(%event_id, error = %e, "Error processing event"),
                }
            }
            Err(e) => error!(error = %e, "Error reading event"),
        }
    }

    // Output final ledger state
    let customers = store.all_customers().await.into_diagnostic()?;
    let stdout = io::stdout();
    CustomerWriter::new(stdout.lock())
        .write_customers(customers)
        .into_diagnostic()?;

    Ok(())
}
