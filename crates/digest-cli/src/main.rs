//! `digestd`: operator CLI and HTTP control surface for the daily
//! news-digest task processor.
//!
//! Commands:
//!   - `init`        write a starter config file
//!   - `db-init`     create the database (if needed) and run migrations
//!   - `status`      show a day's task phase and article counters
//!   - `retry`       requeue failed-but-under-limit articles
//!   - `force-publish` publish whatever has completed, bypassing phase gating
//!   - `tick`        run exactly one Driver tick synchronously
//!   - `serve`       run the HTTP Control API plus the periodic scheduler

mod config;
mod serve_cmd;
mod status_cmd;
mod wiring;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use config::DigestConfig;

#[derive(Parser)]
#[command(name = "digestd", about = "Daily news-digest task processor")]
struct Cli {
    /// Override the database URL (otherwise resolved from env/config/default).
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file to the XDG config directory
    Init {
        /// Database URL to record in the config file
        #[arg(long, default_value = "postgresql://localhost:5432/digest")]
        db_url: String,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database (if needed) and run migrations
    DbInit,
    /// Show a day's task phase, article counters, and recent batches
    Status {
        /// Date to inspect (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Requeue failed-but-under-limit articles for a day
    Retry {
        /// Date to retry (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Publish whatever has completed, bypassing phase gating
    ForcePublish {
        /// Date to publish (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Run exactly one Driver tick synchronously
    Tick {
        /// Date to drive (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Run the HTTP Control API plus the periodic scheduler
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

/// `digestd init`: write a starter config file.
fn cmd_init(db_url: &str, force: bool) -> Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        tunables: config::TunablesSection::default(),
        collaborators: config::CollaboratorsSection {
            news_source_base_url: "https://hacker-news.firebaseio.com/v0".to_owned(),
            article_fetcher_endpoint: "https://fetcher.example.com/fetch".to_owned(),
            llm_endpoint: "https://api.openai.com/v1/chat/completions".to_owned(),
            llm_api_key: "changeme".to_owned(),
            llm_model: "gpt-4o-mini".to_owned(),
            git_repo_path: None,
            git_content_dir: None,
            git_commit_author: None,
            webhook_url: None,
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Edit the [collaborators] section with real endpoints, then run `digestd db-init`.");

    Ok(())
}

/// `digestd db-init`: create the database (if needed) and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> Result<()> {
    let resolved = DigestConfig::resolve(cli_db_url)?;

    println!("Initializing digest database...");

    digest_db::pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = digest_db::pool::create_pool(&resolved.db_config).await?;
    digest_db::pool::run_migrations(&db_pool).await?;

    let counts = digest_db::pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;
    println!("digestd db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Status { date } => {
            let resolved = DigestConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = digest_db::pool::create_pool(&resolved.db_config).await?;
            let result = status_cmd::run_status(&db_pool, date).await;
            db_pool.close().await;
            result?;
        }
        Commands::Retry { date } => {
            let resolved = DigestConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = digest_db::pool::create_pool(&resolved.db_config).await?;
            let ctx = wiring::build_context(db_pool, &resolved);
            let date = date.unwrap_or_else(digest_core::driver::today);
            let outcome = digest_core::control::retry_failed(&ctx, date).await;
            ctx.pool.close().await;
            let outcome = outcome?;
            println!("Requeued {} article(s) for {}.", outcome.requeued, outcome.task_date);
        }
        Commands::ForcePublish { date } => {
            let resolved = DigestConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = digest_db::pool::create_pool(&resolved.db_config).await?;
            let ctx = wiring::build_context(db_pool, &resolved);
            let date = date.unwrap_or_else(digest_core::driver::today);
            let result = digest_core::control::force_publish(&ctx, date).await;
            ctx.pool.close().await;
            result.with_context(|| format!("force-publish failed for {date}"))?;
            println!("Published {date}.");
        }
        Commands::Tick { date } => {
            let resolved = DigestConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = digest_db::pool::create_pool(&resolved.db_config).await?;
            let ctx = wiring::build_context(db_pool, &resolved);
            let date = date.unwrap_or_else(digest_core::driver::today);
            let outcome = digest_core::control::trigger(&ctx, date).await;
            ctx.pool.close().await;
            let outcome = outcome?;
            println!(
                "{}: {:?} -> {:?}{}",
                outcome.task_date,
                outcome.phase_before,
                outcome.phase_after,
                outcome
                    .error
                    .as_ref()
                    .map(|e| format!(" (error: {e})"))
                    .unwrap_or_default()
            );
        }
        Commands::Serve { bind, port } => {
            let resolved = DigestConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = digest_db::pool::create_pool(&resolved.db_config).await?;
            let cron_interval_minutes = resolved.tunables.cron_interval_minutes;
            let ctx = wiring::build_context(db_pool, &resolved);
            serve_cmd::run_serve(ctx, &bind, port, cron_interval_minutes).await?;
        }
    }

    Ok(())
}
