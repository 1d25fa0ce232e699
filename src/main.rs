// src/main.rs

//! jobbatch: batch job-board scraper CLI
//!
//! Manages scrape jobs, dispatches scrape runs, and follows their progress
//! events on stdout as JSON lines.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, warn};

use jobbatch::config::Config;
use jobbatch::error::Result;
use jobbatch::fetch::HttpFetcher;
use jobbatch::models::ScrapeJob;
use jobbatch::notify::Notifier;
use jobbatch::scrape::ScrapeDispatcher;
use jobbatch::sites::SiteKind;
use jobbatch::storage::LocalStore;

#[derive(Parser, Debug)]
#[command(name = "jobbatch", version, about = "Batch job-board scraper")]
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported job sites
    Sites,
    /// List the stored scrape jobs
    Jobs,
    /// Create a scrape job (reuses an existing job with the same name and
    /// site)
    AddJob {
        /// Display name for the job
        name: String,
        /// Site kind, e.g. "remote-ok"
        site: String,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// Run the scrape job with the given id and follow its events
    Scrape { id: i64 },
    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::load_or_default(&cli.config);
    config.validate()?;

    let dispatcher = build_dispatcher(&config)?;

    match cli.command {
        Command::Sites => {
            for kind in SiteKind::all() {
                println!("{kind}");
            }
        }
        Command::Jobs => {
            for job in dispatcher.all_scrape_jobs().await? {
                println!("{}", serde_json::to_string(&job)?);
            }
        }
        Command::AddJob {
            name,
            site,
            base_url,
            keywords,
            location,
        } => {
            // Fail fast on a site the registry does not know.
            site.parse::<SiteKind>()?;
            let job = dispatcher
                .create_scrape_job(ScrapeJob {
                    id: 0,
                    name,
                    site,
                    base_url,
                    keywords,
                    location,
                })
                .await?;
            println!("{}", serde_json::to_string(&job)?);
        }
        Command::Scrape { id } => run_scrape(&dispatcher, id).await?,
        Command::Validate => {
            Config::load(&cli.config)?.validate()?;
            println!("configuration ok");
        }
    }

    Ok(())
}

fn build_dispatcher(config: &Config) -> Result<ScrapeDispatcher> {
    let store = Arc::new(LocalStore::new(config.storage.root_dir.clone()));
    let fetcher = Arc::new(HttpFetcher::new(&config.scraper)?);
    let notifier = Notifier::with_capacity(config.scraper.event_capacity);
    Ok(ScrapeDispatcher::new(
        store,
        fetcher,
        notifier,
        config.scraper.max_workers,
        config.scraper.pause_max_secs,
    ))
}

/// Start one scrape and stream its events until the run ends. Ctrl-C asks
/// the run to stop and keeps following until it winds down.
async fn run_scrape(dispatcher: &ScrapeDispatcher, id: i64) -> Result<()> {
    let mut events = dispatcher.notifier().subscribe_all();

    if let Err(e) = dispatcher.start_scrape(id).await {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
    info!("scrape {id} started");

    let mut poll = tokio::time::interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("event stream lagged, {n} events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("stopping scrape {id}");
                dispatcher.stop_scraping(id).await;
            }
            _ = poll.tick() => {
                if !dispatcher.is_currently_scraping(id).await {
                    break;
                }
            }
        }
    }

    // Flush anything still buffered on the stream.
    while let Ok(event) = events.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
