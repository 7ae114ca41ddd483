use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use gator::commands;
use gator::config::Config;
use gator::feed::HttpFetcher;
use gator::ingest::Ingestor;
use gator::scheduler::Scheduler;
use gator::storage::{Database, StorageError};
use gator::util::parse_interval;

/// Get the config directory path (~/.config/gator/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gator"))
}

#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "RSS aggregator: follow feeds and collect their posts")]
struct Args {
    /// Config file (default: ~/.config/gator/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides `database_path` from the config)
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user and log in as them
    Register { name: String },
    /// Switch to an existing user
    Login { name: String },
    /// List all users
    Users,
    /// Delete all users, feeds, follows and posts
    Reset,
    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },
    /// List all feeds
    Feeds,
    /// Follow an existing feed by URL
    Follow { url: String },
    /// List the feeds you follow
    Following,
    /// Stop following a feed
    Unfollow { url: String },
    /// Show the newest posts from feeds you follow
    Browse {
        #[arg(default_value_t = commands::DEFAULT_BROWSE_LIMIT, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
    /// Fetch feeds forever, one per interval (e.g. 30s, 1m, 1h30m)
    #[command(alias = "agg")]
    Run {
        #[arg(value_parser = parse_interval)]
        interval: Duration,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // RUST_LOG wins over the config file; logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let db_path = match args.database.clone() {
        Some(path) => path,
        None => {
            ensure_config_dir(&config_dir)?;
            config.database_path_in(&config_dir)
        }
    };
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(StorageError::InstanceLocked) => {
            eprintln!("Error: {}", StorageError::InstanceLocked);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to open database"),
    };

    let mut out = std::io::stdout().lock();
    match args.command {
        Command::Register { name } => commands::register(&db, &name, &mut out).await,
        Command::Login { name } => commands::login(&db, &name, &mut out).await,
        Command::Users => commands::users(&db, &mut out).await,
        Command::Reset => commands::reset(&db, &mut out).await,
        Command::AddFeed { name, url } => {
            commands::add_feed(&db, &config, &name, &url, &mut out).await
        }
        Command::Feeds => commands::feeds(&db, &mut out).await,
        Command::Follow { url } => commands::follow(&db, &url, &mut out).await,
        Command::Following => commands::following(&db, &mut out).await,
        Command::Unfollow { url } => commands::unfollow(&db, &url, &mut out).await,
        Command::Browse { limit } => commands::browse(&db, limit, &mut out).await,
        Command::Run { interval } => {
            drop(out);
            run(db, &config, interval).await
        }
    }
}

/// Runs the scheduler until Ctrl-C or SIGTERM.
async fn run(db: Database, config: &Config, interval: Duration) -> Result<()> {
    let fetcher = HttpFetcher::from_config(config).context("Failed to build HTTP client")?;
    let scheduler = Scheduler::new(Ingestor::new(db, fetcher), interval)?;

    let handle = scheduler.spawn();
    shutdown_signal().await?;
    tracing::info!("Shutdown signal received");

    let cycles = handle.stop().await;
    println!("Stopped after {cycles} cycles");
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

fn ensure_config_dir(config_dir: &std::path::Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // SEC-007: user-only access to the directory holding the database
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    Ok(())
}
