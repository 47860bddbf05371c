use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use twitter_clone::config::Config;
use twitter_clone::observability::{init_logging, init_metrics};
use twitter_clone::server;
use twitter_clone::state::AppState;
use twitter_clone::storage::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "twitter_clone")]
#[command(about = "Micro-blogging backend with follow-gated feeds")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the database schema and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    let _log_guard = init_logging(Path::new(&config.logging.dir));

    let store = SqliteStore::open(&config.database.path)?;
    store.run_migrations()?;

    match cli.command {
        Commands::Migrate => {
            info!("Schema is up to date at {}", config.database.path);
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            init_metrics();

            let store: Arc<dyn Store> = Arc::new(store);
            let state = AppState::new(store, config.auth.clone());
            let addr = format!("{}:{}", config.server.host, config.server.port);
            server::start_server(state, &addr).await?;
        }
    }

    Ok(())
}
