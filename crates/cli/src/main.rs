use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use netcache_cli::{init_logging, App, AppOptions, Config};
use netcache_client::FetchOutcome;
use netcache_core::{CacheKey, ClassifiedError, RequestDescriptor};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "netcache",
    about = "Fetch API lists with a local cache and offline fallback",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Output format", default_value = "pretty")]
    format: OutputFormat,

    #[arg(short, long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch a list endpoint, falling back to the cache on failure")]
    Fetch {
        #[arg(help = "Endpoint path relative to the base URL (e.g., games)")]
        path: String,

        #[arg(short, long = "query", value_parser = parse_query_pair, help = "Query parameter as name=value")]
        query: Vec<(String, String)>,

        #[arg(long, help = "Skip the network and serve cached data only")]
        offline: bool,

        #[arg(long, help = "Publish the first items to the shared snapshot")]
        publish: bool,
    },

    #[command(about = "Inspect or modify the result cache")]
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    #[command(about = "Show the shared snapshot")]
    Snapshot,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Show the cached items for a key (e.g., games?page=1)")]
    Get { key: String },

    #[command(about = "Show cache metadata for a key")]
    Meta { key: String },

    #[command(about = "Delete the cached record for a key")]
    Delete { key: String },

    #[command(about = "Delete every cached record")]
    Clear,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Raw,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
        config.validate()?;
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Fetch {
            path,
            query,
            offline,
            publish,
        } => {
            let app = App::new(&config, AppOptions { offline, publish }).await?;
            let descriptor = query
                .into_iter()
                .fold(RequestDescriptor::get(path), |d, (name, value)| {
                    d.query(name, value)
                });
            fetch(&app, &descriptor, cli.format).await
        }
        Commands::Cache { action } => {
            let app = App::new(&config, AppOptions::default()).await?;
            cache_command(&app, action, cli.format).await
        }
        Commands::Snapshot => {
            let app = App::new(&config, AppOptions::default()).await?;
            match app.bridge().read_snapshot().await? {
                Some(snapshot) => print(&snapshot, cli.format),
                None => {
                    println!("No snapshot at {}", app.bridge().path().display());
                    Ok(())
                }
            }
        }
    }
}

async fn fetch(app: &App, descriptor: &RequestDescriptor, format: OutputFormat) -> Result<()> {
    let key = descriptor.cache_key();
    let outcome = app.fetch(descriptor).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report(&key, &outcome))?),
        OutputFormat::Pretty => {
            match &outcome {
                FetchOutcome::Fresh(items) => println!("{key}: {} fresh item(s)\n", items.len()),
                FetchOutcome::Fallback {
                    items,
                    fetched_at,
                    error,
                } => println!(
                    "{key}: {} cached item(s) from {fetched_at} ({error})\n",
                    items.len()
                ),
                FetchOutcome::Failed(error) => println!("{key}: {error}"),
            }
            if let Some(items) = outcome.items() {
                println!("{}", serde_json::to_string_pretty(items)?);
            }
        }
        OutputFormat::Raw => {
            for item in outcome.items().unwrap_or_default() {
                println!("{item}");
            }
        }
    }

    match outcome {
        FetchOutcome::Failed(error) => bail!("fetch failed: {}", error.message_key()),
        _ => Ok(()),
    }
}

async fn cache_command(app: &App, action: CacheCommand, format: OutputFormat) -> Result<()> {
    let cache = app.cache();
    match action {
        CacheCommand::Get { key } => {
            let key = CacheKey::new(key);
            let record = cache
                .get(&key)
                .await?
                .ok_or_else(|| anyhow!("no cached record for '{key}'"))?;
            match format {
                OutputFormat::Raw => {
                    for item in &record.items {
                        println!("{item}");
                    }
                    Ok(())
                }
                _ => print(&record, format),
            }
        }
        CacheCommand::Meta { key } => {
            let key = CacheKey::new(key);
            let meta = cache
                .meta(&key)
                .await?
                .ok_or_else(|| anyhow!("no cached record for '{key}'"))?;
            print(&meta, format)
        }
        CacheCommand::Delete { key } => {
            cache.delete(&CacheKey::new(key.clone())).await?;
            println!("Deleted '{key}'");
            Ok(())
        }
        CacheCommand::Clear => {
            cache.clear().await?;
            println!("Cache cleared");
            Ok(())
        }
    }
}

fn report(key: &CacheKey, outcome: &FetchOutcome<Value>) -> Value {
    match outcome {
        FetchOutcome::Fresh(items) => json!({
            "status": "fresh",
            "key": key,
            "items": items,
        }),
        FetchOutcome::Fallback {
            items,
            fetched_at,
            error,
        } => json!({
            "status": "fallback",
            "key": key,
            "fetched_at": fetched_at,
            "error": error_report(error),
            "items": items,
        }),
        FetchOutcome::Failed(error) => json!({
            "status": "failed",
            "key": key,
            "error": error_report(error),
        }),
    }
}

fn error_report(error: &ClassifiedError) -> Value {
    json!({
        "message_key": error.message_key(),
        "message": error.to_string(),
        "retryable": error.is_retryable(),
    })
}

fn print<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Raw => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn parse_query_pair(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    if name.is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}
