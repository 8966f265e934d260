//! Database row types. Timestamps are unix seconds.

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchRow {
    pub name: String,
    pub url: String,
    /// Whole euros. 0 means no lower bound.
    pub min_price: i64,
    /// Whole euros. 99999 means no upper bound.
    pub max_price: i64,
    pub active: bool,
}

/// A stored listing as reported back to the user. The owning search is
/// implied by the query, so the row does not carry it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    pub link: String,
    pub title: String,
    pub price: i64,
    pub location: String,
    pub first_seen: i64,
    pub last_seen: i64,
}
