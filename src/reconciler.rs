use chrono::{Duration, Utc};
use tracing::debug;

use crate::config::STALE_AFTER_DAYS;
use crate::db::models::SearchRow;
use crate::db::Store;
use crate::error::Result;
use crate::types::{ListingCandidate, ScanEvent};

/// Sole writer of listing state. Decides, for each candidate from a result
/// page, whether it is new, cheaper, unchanged, sold or out of bounds, and
/// applies the matching mutation before reporting the event.
pub struct Reconciler {
    store: Store,
}

impl Reconciler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Reconcile one candidate against stored state. Returns the event it
    /// produced; unchanged sightings and skipped candidates return None.
    pub async fn reconcile(
        &self,
        search: &SearchRow,
        candidate: &ListingCandidate,
    ) -> Result<Option<ScanEvent>> {
        if candidate.sold {
            // Only an actual deletion is worth an event; sold adverts we
            // never stored are not our loss.
            let deleted = self.store.delete_listing(&candidate.link).await?;
            if deleted == 0 {
                return Ok(None);
            }
            return Ok(Some(ScanEvent::Removed {
                link: candidate.link.clone(),
                title: candidate.title.clone(),
            }));
        }

        // Bounds apply before persistence so excluded listings never enter
        // the price distribution.
        if candidate.price < search.min_price || candidate.price > search.max_price {
            debug!(
                search = %search.name,
                price = candidate.price,
                "candidate outside price bounds, skipped"
            );
            return Ok(None);
        }

        let now = Utc::now().timestamp();
        match self.store.listing_price(&candidate.link).await? {
            None => {
                self.store
                    .insert_listing(candidate, &search.name, now)
                    .await?;
                Ok(Some(ScanEvent::New(candidate.clone())))
            }
            Some(old_price) if old_price > candidate.price => {
                self.store
                    .update_listing_price(&candidate.link, candidate.price, now)
                    .await?;
                Ok(Some(ScanEvent::PriceDrop {
                    candidate: candidate.clone(),
                    old_price,
                }))
            }
            Some(_) => {
                // Same or higher price: still alive, keep recency fresh.
                // Increases are not surfaced.
                self.store.touch_listing(&candidate.link, now).await?;
                Ok(None)
            }
        }
    }

    /// Delete listings unseen for STALE_AFTER_DAYS across all searches.
    /// Returns how many were pruned.
    pub async fn sweep_stale(&self) -> Result<u64> {
        let cutoff = (Utc::now() - Duration::days(STALE_AFTER_DAYS)).timestamp();
        self.store.prune_stale(cutoff).await
    }
}
