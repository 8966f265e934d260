use std::time::Duration;

use chrono::{Local, Timelike};
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::classifier::{self, AlertKind};
use crate::config::{PACING_MAX_SECS, PACING_MIN_SECS, RESULT_PAGE_LIMIT, STALE_AFTER_DAYS};
use crate::db::models::SearchRow;
use crate::db::Store;
use crate::error::Result;
use crate::extractor::extract_listings;
use crate::fetcher::Fetcher;
use crate::notify::Notifier;
use crate::reconciler::Reconciler;
use crate::stats::PriceStats;
use crate::types::{CycleStats, PageResult, ScanEvent};

/// Drives poll cycles: one pass over every active search, page by page,
/// strictly sequential so the site only ever sees one request at a time.
pub struct Scheduler {
    store: Store,
    fetcher: Fetcher,
    notifier: Notifier,
    reconciler: Reconciler,
    price_stats: PriceStats,
}

impl Scheduler {
    pub fn new(store: Store, fetcher: Fetcher, notifier: Notifier) -> Self {
        let reconciler = Reconciler::new(store.clone());
        let price_stats = PriceStats::new(store.clone());
        Self {
            store,
            fetcher,
            notifier,
            reconciler,
            price_stats,
        }
    }

    /// One poll cycle: staleness sweep, then every active search in turn.
    /// A failing search abandons only its own scan. Alerts are delivered
    /// per search as each scan completes, unless `notify` is false.
    pub async fn run_cycle(&self, notify: bool) -> Result<CycleStats> {
        let mut stats = CycleStats::default();

        stats.pruned_stale = self.reconciler.sweep_stale().await?;
        if stats.pruned_stale > 0 {
            info!(
                pruned = stats.pruned_stale,
                "Pruned {} listings unseen for {STALE_AFTER_DAYS} days",
                stats.pruned_stale
            );
        }

        let searches = self.store.active_searches().await?;
        if searches.is_empty() {
            info!("No active searches to scan");
            return Ok(stats);
        }

        for search in &searches {
            match self.scan_search(search, &mut stats).await {
                Ok(alerts) => {
                    stats.searches_scanned += 1;
                    stats.alerts += alerts.len();
                    if notify {
                        self.notifier.send_batch(&alerts).await;
                    }
                }
                Err(e) => {
                    stats.searches_failed += 1;
                    error!(search = %search.name, "Scan of \"{}\" failed: {e}", search.name);
                }
            }
        }

        Ok(stats)
    }

    /// Scan one search across result pages, reconciling every candidate.
    /// Returns the rendered alerts the scan produced, in page order.
    pub async fn scan_search(
        &self,
        search: &SearchRow,
        stats: &mut CycleStats,
    ) -> Result<Vec<String>> {
        info!(search = %search.name, "Scanning \"{}\"", search.name);

        // Model from state prior to this scan, so page-1 inserts cannot
        // shift what later pages of the same scan are judged against.
        let model = self.price_stats.model_for(&search.name).await?;
        match &model {
            Some(m) => info!(
                search = %search.name,
                "Market model: avg {:.2}€, std {:.2}, {} samples",
                m.mean, m.std_dev, m.sample_count
            ),
            None => info!(search = %search.name, "Market model still cold, reporting everything"),
        }

        let mut alerts = Vec::new();

        'pages: for page in 1..=RESULT_PAGE_LIMIT {
            pacing_delay().await;
            let body = self.fetcher.fetch_page(&search.url, page).await?;
            stats.pages_fetched += 1;

            let candidates = match extract_listings(&body) {
                PageResult::Page(candidates) if candidates.is_empty() => {
                    debug!(search = %search.name, page, "Empty result page, stopping pagination");
                    break 'pages;
                }
                PageResult::Page(candidates) => candidates,
                PageResult::EndOfResults => {
                    debug!(search = %search.name, page, "No data block, past the last page");
                    break 'pages;
                }
                PageResult::DecodeError(reason) => {
                    warn!(
                        search = %search.name,
                        page,
                        "Result payload not decodable ({reason}), stopping pagination"
                    );
                    break 'pages;
                }
            };

            for candidate in &candidates {
                let Some(event) = self.reconciler.reconcile(search, candidate).await? else {
                    continue;
                };
                match &event {
                    ScanEvent::New(_) => stats.new_listings += 1,
                    ScanEvent::PriceDrop { .. } => stats.price_drops += 1,
                    ScanEvent::Removed { link, title } => {
                        stats.removed += 1;
                        info!(search = %search.name, link = %link, "Sold, removed: {title}");
                    }
                }
                match classifier::classify_event(&event, model.as_ref()) {
                    Some(alert) => {
                        match &alert.kind {
                            AlertKind::Deal { tier, .. } => info!(
                                search = %search.name,
                                "[{tier}] {} | {}€", alert.title, alert.price
                            ),
                            AlertKind::PriceDrop { old_price } => info!(
                                search = %search.name,
                                "[price_drop] {} | {}€ (was {old_price}€)",
                                alert.title, alert.price
                            ),
                        }
                        alerts.push(alert.render());
                    }
                    None => {
                        if let ScanEvent::New(c) = &event {
                            debug!(
                                search = %search.name,
                                "Stored without alert: {} | {}€", c.title, c.price
                            );
                        }
                    }
                }
            }
        }

        Ok(alerts)
    }

    /// Continuous mode. Each iteration checks the active window, maybe runs
    /// a cycle, then sleeps `delay_secs` until the next check or until
    /// ctrl-c. The first cycle after startup computes and persists but does
    /// not deliver, so a fresh deployment cannot flood the chat with a
    /// backlog of "new" listings.
    pub async fn run_daemon(&self, active_hour: u32, pause_hour: u32, delay_secs: u64) -> Result<()> {
        info!(
            "Daemon started: window {active_hour}:00-{pause_hour}:00, {delay_secs}s between cycles"
        );
        let delay = Duration::from_secs(delay_secs);
        let mut notify = false;

        loop {
            if in_active_window(Local::now().hour(), active_hour, pause_hour) {
                match self.run_cycle(notify).await {
                    Ok(stats) => info!("Cycle complete: {stats}"),
                    Err(e) => error!("Poll cycle failed: {e}"),
                }
                notify = true;
            } else {
                debug!("Outside active window, skipping cycle");
            }

            tokio::select! {
                _ = sleep(delay) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping daemon");
                    return Ok(());
                }
            }
        }
    }
}

/// Randomized pause before each page request, so the fetch cadence does not
/// look machine-regular to the site.
async fn pacing_delay() {
    let secs = rand::thread_rng().gen_range(PACING_MIN_SECS..PACING_MAX_SECS);
    sleep(Duration::from_secs_f64(secs)).await;
}

/// Wraparound-aware containment of `hour` in [start, end).
/// start == end means always active; start > end spans midnight.
pub fn in_active_window(hour: u32, start: u32, end: u32) -> bool {
    if start < end {
        start <= hour && hour < end
    } else if start == end {
        true
    } else {
        hour >= start || hour < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::config::Config;
    use crate::db::memory_store;
    use crate::types::ListingCandidate;

    fn muted_notifier() -> Notifier {
        let cfg = Config {
            log_level: "info".to_string(),
            db_path: ":memory:".to_string(),
            telegram: None,
            ntfy: None,
        };
        Notifier::new(&cfg, true, true).unwrap()
    }

    // Both searches point at a local port nothing listens on, so every
    // page fetch fails with a connection error.
    #[tokio::test]
    async fn failing_searches_do_not_stop_the_cycle() {
        let store = memory_store().await;
        store
            .upsert_search("gpu", "http://127.0.0.1:9/annunci?q=rtx+3080", 0, 99_999)
            .await
            .unwrap();
        store
            .upsert_search("sofa", "http://127.0.0.1:9/annunci?q=divano", 0, 99_999)
            .await
            .unwrap();

        let stale = ListingCandidate {
            link: "https://example.org/gone.htm".to_string(),
            title: "Long gone".to_string(),
            price: 40,
            sold: false,
            location: "Roma".to_string(),
        };
        let forty_days_ago = Utc::now().timestamp() - 40 * 24 * 3600;
        store
            .insert_listing(&stale, "gpu", forty_days_ago)
            .await
            .unwrap();

        let scheduler = Scheduler::new(store.clone(), Fetcher::new().unwrap(), muted_notifier());
        let stats = scheduler.run_cycle(false).await.unwrap();

        assert_eq!(stats.searches_failed, 2, "every unreachable scan is counted");
        assert_eq!(stats.searches_scanned, 0);
        assert_eq!(stats.pages_fetched, 0);
        assert_eq!(stats.pruned_stale, 1, "the sweep still ran");
        assert_eq!(
            store.listing_price("https://example.org/gone.htm").await.unwrap(),
            None
        );
    }

    #[test]
    fn daytime_window_is_half_open() {
        assert!(in_active_window(8, 8, 20), "start hour is inside");
        assert!(in_active_window(19, 8, 20));
        assert!(!in_active_window(20, 8, 20), "end hour is outside");
        assert!(!in_active_window(7, 8, 20));
    }

    #[test]
    fn overnight_window_spans_midnight() {
        assert!(in_active_window(23, 22, 6));
        assert!(in_active_window(22, 22, 6));
        assert!(in_active_window(3, 22, 6));
        assert!(!in_active_window(10, 22, 6));
        assert!(!in_active_window(6, 22, 6));
    }

    #[test]
    fn equal_bounds_mean_always_active() {
        for hour in 0..24 {
            assert!(in_active_window(hour, 9, 9));
            assert!(in_active_window(hour, 0, 0));
        }
    }
}
