use clap::Parser;
use std::path::{Path, PathBuf};
use twitter_clone::config::Config;
use twitter_clone::observability::init_logging;
use twitter_clone::seed::{self, SeedFixture};
use twitter_clone::storage::SqliteStore;

#[derive(Parser)]
#[command(name = "seed-database")]
#[command(about = "Load users, follow edges, tweets, likes and replies from a TOML fixture")]
struct Cli {
    /// Fixture file to load
    #[arg(default_value = "fixtures/demo.toml")]
    fixture: PathBuf,

    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let _log_guard = init_logging(Path::new(&config.logging.dir));

    let fixture = SeedFixture::from_file(&cli.fixture)?;

    let store = SqliteStore::open(&config.database.path)?;
    store.run_migrations()?;

    let summary = seed::apply(&store, &fixture).await?;

    println!("Seeded {}:", config.database.path);
    println!("   Users created: {}", summary.users_created);
    println!("   Users reused:  {}", summary.users_skipped);
    println!("   Follow edges:  {}", summary.follows);
    println!("   Tweets:        {}", summary.tweets);
    println!("   Tweets reused: {}", summary.tweets_skipped);
    println!("   Likes:         {}", summary.likes);
    println!("   Replies:       {}", summary.replies);
    println!("   Engagement on reused tweets skipped: {}", summary.engagement_skipped);
    Ok(())
}
