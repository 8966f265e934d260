mod classifier;
mod cli;
mod config;
mod db;
mod error;
mod extractor;
mod fetcher;
mod notify;
mod reconciler;
mod scheduler;
mod stats;
mod types;

use clap::{CommandFactory, Parser};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::config::{Config, MAX_PRICE_SENTINEL};
use crate::db::models::SearchRow;
use crate::db::Store;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::notify::Notifier;
use crate::scheduler::Scheduler;
use crate::types::CycleStats;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if args.is_empty() {
        Args::command().print_help().ok();
        return;
    }

    if let Err(e) = run(cfg, args).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, args: Args) -> Result<()> {
    let pool = db::connect(&cfg.db_path).await?;
    let store = Store::new(pool);
    info!("Database ready at {}", cfg.db_path);

    // --- One-off search management ---

    if let (Some(name), Some(url)) = (&args.add, &args.url) {
        let min_price = args.min_price.unwrap_or(0);
        let max_price = args.max_price.unwrap_or(MAX_PRICE_SENTINEL);
        store.upsert_search(name, url, min_price, max_price).await?;
        info!("Tracked search \"{name}\" saved");
    }

    if let Some(name) = &args.delete {
        if store.delete_search(name).await? > 0 {
            info!("Tracked search \"{name}\" and its listings deleted");
        } else {
            warn!("No tracked search named \"{name}\"");
        }
    }

    if let Some(name) = &args.pause {
        if store.set_search_active(name, false).await? > 0 {
            info!("Tracked search \"{name}\" paused");
        } else {
            warn!("No tracked search named \"{name}\"");
        }
    }

    if let Some(name) = &args.resume {
        if store.set_search_active(name, true).await? > 0 {
            info!("Tracked search \"{name}\" resumed");
        } else {
            warn!("No tracked search named \"{name}\"");
        }
    }

    if args.list {
        print_searches(&store).await?;
    }
    if args.short_list {
        print_search_summary(&store).await?;
    }

    // --- Scanning ---

    let needs_scanner = args.add.is_some() || args.refresh || args.daemon;
    if !needs_scanner {
        return Ok(());
    }

    let fetcher = Fetcher::new()?;
    let notifier = Notifier::new(&cfg, args.telegram_off, args.ntfy_off)?;
    let scheduler = Scheduler::new(store.clone(), fetcher, notifier);

    // A freshly added search is scanned immediately to seed its state, but
    // nothing is delivered: with no baseline every listing would alert.
    if let Some(name) = &args.add {
        if let Some(search) = store.get_search(name).await? {
            seed_scan(&scheduler, &search).await;
        }
    }

    if args.refresh {
        let stats = scheduler.run_cycle(true).await?;
        info!("Refresh complete: {stats}");
    }

    if args.daemon {
        scheduler
            .run_daemon(args.active_hour, args.pause_hour, args.delay)
            .await?;
    }

    Ok(())
}

/// Initial scan of a just-added search. Alerts are computed and discarded.
async fn seed_scan(scheduler: &Scheduler, search: &SearchRow) {
    let mut stats = CycleStats::default();
    match scheduler.scan_search(search, &mut stats).await {
        Ok(_) => info!(
            "Initial scan of \"{}\" complete: {}",
            search.name,
            stats.scan_summary()
        ),
        Err(e) => error!("Initial scan of \"{}\" failed: {e}", search.name),
    }
}

/// Full report: every search with its stored listings (--list).
async fn print_searches(store: &Store) -> Result<()> {
    let searches = store.all_searches().await?;
    if searches.is_empty() {
        println!("No tracked searches.");
        return Ok(());
    }
    for search in &searches {
        println!("\nsearch: {}{}", search.name, if search.active { "" } else { " (paused)" });
        println!("query url: {}", search.url);
        let listings = store.listings_for_search(&search.name).await?;
        if listings.is_empty() {
            println!("  no listings stored yet");
            continue;
        }
        for listing in &listings {
            println!("\n {} : {}€ --> {}", listing.title, listing.price, listing.location);
            println!("  {}", listing.link);
        }
    }
    Ok(())
}

/// One line per search with its bounds (--short-list).
async fn print_search_summary(store: &Store) -> Result<()> {
    let searches = store.all_searches().await?;
    if searches.is_empty() {
        println!("No tracked searches.");
        return Ok(());
    }
    for (i, search) in searches.iter().enumerate() {
        let mut line = format!("{}) search: {} | {}", i + 1, search.name, search.url);
        if search.min_price > 0 || search.max_price < MAX_PRICE_SENTINEL {
            line.push_str(" | ");
            if search.min_price > 0 {
                line.push_str(&format!("{} < ", search.min_price));
            }
            line.push_str("price");
            if search.max_price < MAX_PRICE_SENTINEL {
                line.push_str(&format!(" < {}", search.max_price));
            }
        }
        if !search.active {
            line.push_str(" | paused");
        }
        println!("{line}");
    }
    Ok(())
}
