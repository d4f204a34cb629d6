use std::sync::Arc;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use media_dispatch::application::errors::HandlerError;
use media_dispatch::application::messaging::ListenerStats;
use media_dispatch::{
    Config, DeferredDispatcher, Destination, DestinationListener, DispatchError, DispatchMessage,
    EntityType, HandlerRegistry, InMemoryMessageBus, MediaModel, MediaProcessor, MessageBus,
    MessageHandler, ProcessorLocator, TransactionError, TransactionManager,
};

#[derive(Parser)]
#[command(name = "media-dispatch")]
#[command(about = "Deferred media processor dispatch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sample workload through the dispatcher and print what gets delivered
    Run(RunArgs),
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Number of transactions to run
    #[arg(short = 'n', long, default_value_t = 3)]
    transactions: u64,

    /// Roll back every Nth transaction (0 = never)
    #[arg(short, long, default_value_t = 0)]
    rollback_every: u64,

    /// Also request clean-up of the previous image in each transaction
    #[arg(long)]
    clean_up: bool,
}

/// Image attachment used by the sample workload
#[derive(Debug, Serialize)]
struct ImageAttachment {
    id: u64,
    file_name: String,
}

impl MediaModel for ImageAttachment {
    fn entity_type_name() -> String {
        "media.ImageAttachment".to_string()
    }
}

#[derive(Error, Debug)]
enum WorkloadError {
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    Transaction(#[from] TransactionError),

    #[error("Transaction {0} aborted by workload")]
    Aborted(u64),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Prints every message it receives
struct PrintHandler;

#[async_trait]
impl MessageHandler for PrintHandler {
    async fn handle(&self, message: &DispatchMessage) -> Result<(), HandlerError> {
        let payload = serde_json::to_string(&message.to_payload())
            .map_err(|e| HandlerError::InvalidMessage(e.to_string()))?;
        println!("[DELIVERED] {}", payload);
        Ok(())
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            if let Err(e) = run_workload(&cli.config, args) {
                tracing::error!("Workload failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("media-dispatch v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        match Config::load(config_path) {
            Ok(config) => config.apply_env(),
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Config::load_env()
            }
        }
    } else {
        Config::load_env()
    }
}

fn run_workload(config_path: &str, args: RunArgs) -> Result<(), WorkloadError> {
    let config = load_config(config_path);
    tracing::info!(
        "Dispatching to {} (no-transaction policy: {})",
        config.dispatcher.destination,
        config.dispatcher.no_transaction
    );

    let bus = Arc::new(InMemoryMessageBus::with_destinations(config.all_destinations()));
    let destination = Destination::new(config.dispatcher.destination.clone());
    let receiver = bus.subscribe(&destination).map_err(DispatchError::from)?;

    let mut handlers = HandlerRegistry::new();
    handlers.register(EntityType::of::<ImageAttachment>().map_err(DispatchError::from)?, PrintHandler);
    let mut listener = DestinationListener::new(destination, receiver, handlers);

    let manager = TransactionManager::new();
    let bus_handle: Arc<dyn MessageBus> = bus.clone();
    let dispatcher = DeferredDispatcher::new(bus_handle, Arc::new(manager.clone()), &config.dispatcher);
    let locator = ProcessorLocator::new(Arc::new(dispatcher));
    let processor = locator.locate_for::<ImageAttachment>().map_err(DispatchError::from)?;

    let rt = tokio::runtime::Runtime::new()?;

    let listener_stats = rt.block_on(async {
        for i in 1..=args.transactions {
            let result = manager
                .execute(async {
                    let image = ImageAttachment { id: i, file_name: format!("image-{}.png", i) };
                    processor.process(&image)?;

                    if args.clean_up && i > 1 {
                        let previous = ImageAttachment { id: i - 1, file_name: format!("image-{}.png", i - 1) };
                        processor.clean_up(&previous)?;
                    }

                    if args.rollback_every > 0 && i % args.rollback_every == 0 {
                        return Err(WorkloadError::Aborted(i));
                    }
                    Ok::<(), WorkloadError>(())
                })
                .await;

            match result {
                Ok(()) => tracing::info!("Transaction {} committed", i),
                Err(WorkloadError::Aborted(n)) => tracing::info!("Transaction {} rolled back", n),
                Err(e) => return Err(e),
            }
        }

        Ok::<ListenerStats, WorkloadError>(listener.drain().await)
    })?;

    let txn_stats = manager.stats();
    let bus_stats = bus.stats();
    println!(
        "transactions: {} committed, {} rolled back | bus: {} sent, {} dropped, {} failed | delivered: {}",
        txn_stats.committed,
        txn_stats.rolled_back,
        bus_stats.sent,
        bus_stats.dropped,
        bus_stats.failed,
        listener_stats.handled
    );
    Ok(())
}

fn init_config() {
    match serde_yaml::to_string(&Config::default()) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render default config: {}", e),
    }
}
