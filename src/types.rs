// ---------------------------------------------------------------------------
// Listing candidates decoded from one result page
// ---------------------------------------------------------------------------

/// One advert as decoded from a result page, before any reconciliation
/// against stored state. The link doubles as the listing identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCandidate {
    pub link: String,
    pub title: String,
    /// Whole euros. A missing or malformed price decodes to 0.
    pub price: i64,
    pub sold: bool,
    pub location: String,
}

/// Outcome of decoding one fetched page.
#[derive(Debug)]
pub enum PageResult {
    /// Data block found and decoded; candidates in page order.
    Page(Vec<ListingCandidate>),
    /// No embedded data block: pagination walked past the last page.
    EndOfResults,
    /// Data block present but not decodable as the expected shape.
    DecodeError(String),
}

// ---------------------------------------------------------------------------
// Reconciliation events
// ---------------------------------------------------------------------------

/// State change produced by reconciling one candidate against the store.
/// Unchanged sightings and out-of-bounds candidates produce no event.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Candidate not seen before; now stored.
    New(ListingCandidate),
    /// Stored listing re-observed at a lower price; store updated.
    PriceDrop {
        candidate: ListingCandidate,
        old_price: i64,
    },
    /// Source marked the listing sold; stored row deleted.
    Removed { link: String, title: String },
}

// ---------------------------------------------------------------------------
// Market model
// ---------------------------------------------------------------------------

/// Trimmed price statistics for one search, built from recent sightings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketModel {
    pub mean: f64,
    /// Population standard deviation of the trimmed sample.
    pub std_dev: f64,
    /// Samples surviving the IQR trim.
    pub sample_count: usize,
    /// Q1 of the raw sample. Fallback alert floor when std_dev is zero.
    pub lower_quartile: f64,
}

// ---------------------------------------------------------------------------
// Deal tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealTier {
    /// No baseline yet; every stored listing is reported while the
    /// search's market model is cold.
    FirstScan,
    /// z <= -2.0
    ImperativeDeal,
    /// z <= -1.5
    StrongDeal,
    /// z <= -1.0, or below Q1 when the model is degenerate.
    GoodPrice,
}

impl std::fmt::Display for DealTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DealTier::FirstScan => "first_scan",
            DealTier::ImperativeDeal => "imperative_deal",
            DealTier::StrongDeal => "strong_deal",
            DealTier::GoodPrice => "good_price",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Cycle accounting
// ---------------------------------------------------------------------------

/// Counters accumulated over one poll cycle, logged when the cycle ends.
#[derive(Debug, Default)]
pub struct CycleStats {
    pub searches_scanned: usize,
    pub searches_failed: usize,
    pub pages_fetched: usize,
    pub new_listings: usize,
    pub price_drops: usize,
    pub removed: usize,
    pub alerts: usize,
    pub pruned_stale: u64,
}

impl CycleStats {
    /// Counters a single search's scan populates. Cycle-level totals
    /// (searches, alerts, pruning) are left out, so this is the right
    /// rendering for a one-search pass.
    pub fn scan_summary(&self) -> String {
        format!(
            "{} pages, {} new, {} price drops, {} removed",
            self.pages_fetched, self.new_listings, self.price_drops, self.removed
        )
    }
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} searches scanned ({} failed), {}, {} alerts, {} stale pruned",
            self.searches_scanned,
            self.searches_failed,
            self.scan_summary(),
            self.alerts,
            self.pruned_stale
        )
    }
}
