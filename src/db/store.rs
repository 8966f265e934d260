use sqlx::SqlitePool;

use crate::db::models::{ListingRow, SearchRow};
use crate::error::Result;
use crate::types::ListingCandidate;

/// All persistence for tracked searches and their listings. Every mutation
/// is one committed statement, so a crash mid-scan loses at most the item
/// in flight.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Searches
    // -----------------------------------------------------------------------

    /// Insert or update a tracked search. Re-adding an existing name
    /// replaces its URL and bounds and reactivates it; stored listings
    /// are untouched.
    pub async fn upsert_search(
        &self,
        name: &str,
        url: &str,
        min_price: i64,
        max_price: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO searches (name, url, min_price, max_price, active)
            VALUES (?, ?, ?, ?, 1)
            ON CONFLICT(name) DO UPDATE SET
                url = excluded.url,
                min_price = excluded.min_price,
                max_price = excluded.max_price,
                active = 1
            "#,
        )
        .bind(name)
        .bind(url)
        .bind(min_price)
        .bind(max_price)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a search; the schema cascades to its listings. Returns the
    /// number of searches removed (0 when the name was unknown).
    pub async fn delete_search(&self, name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM searches WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Flip a search in or out of the scan rotation. Returns 0 when the
    /// name was unknown.
    pub async fn set_search_active(&self, name: &str, active: bool) -> Result<u64> {
        let result = sqlx::query("UPDATE searches SET active = ? WHERE name = ?")
            .bind(active)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_search(&self, name: &str) -> Result<Option<SearchRow>> {
        let row = sqlx::query_as::<_, SearchRow>(
            "SELECT name, url, min_price, max_price, active FROM searches WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn active_searches(&self) -> Result<Vec<SearchRow>> {
        let rows = sqlx::query_as::<_, SearchRow>(
            "SELECT name, url, min_price, max_price, active FROM searches WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn all_searches(&self) -> Result<Vec<SearchRow>> {
        let rows = sqlx::query_as::<_, SearchRow>(
            "SELECT name, url, min_price, max_price, active FROM searches ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    /// Stored price for a link, if the listing is known.
    pub async fn listing_price(&self, link: &str) -> Result<Option<i64>> {
        let price = sqlx::query_scalar::<_, i64>("SELECT price FROM listings WHERE link = ?")
            .bind(link)
            .fetch_optional(&self.pool)
            .await?;
        Ok(price)
    }

    pub async fn insert_listing(
        &self,
        candidate: &ListingCandidate,
        search_name: &str,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listings (link, title, price, search_name, location, first_seen, last_seen)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&candidate.link)
        .bind(&candidate.title)
        .bind(candidate.price)
        .bind(search_name)
        .bind(&candidate.location)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_listing_price(&self, link: &str, price: i64, now: i64) -> Result<()> {
        sqlx::query("UPDATE listings SET price = ?, last_seen = ? WHERE link = ?")
            .bind(price)
            .bind(now)
            .bind(link)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Refresh last_seen for a listing observed unchanged.
    pub async fn touch_listing(&self, link: &str, now: i64) -> Result<()> {
        sqlx::query("UPDATE listings SET last_seen = ? WHERE link = ?")
            .bind(now)
            .bind(link)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete one listing. Returns 0 when the link was never stored, so
    /// callers can tell a real removal from a no-op.
    pub async fn delete_listing(&self, link: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM listings WHERE link = ?")
            .bind(link)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Stored listings for one search, cheapest first.
    pub async fn listings_for_search(&self, search_name: &str) -> Result<Vec<ListingRow>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT link, title, price, location, first_seen, last_seen
            FROM listings WHERE search_name = ? ORDER BY price ASC, link ASC
            "#,
        )
        .bind(search_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Prices observed for one search with last_seen at or after `since`,
    /// newest first, capped at `limit` samples.
    pub async fn recent_prices(&self, search_name: &str, since: i64, limit: i64) -> Result<Vec<i64>> {
        let prices = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT price FROM listings
            WHERE search_name = ? AND last_seen >= ?
            ORDER BY last_seen DESC LIMIT ?
            "#,
        )
        .bind(search_name)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(prices)
    }

    /// Delete every listing not seen since `cutoff`, across all searches.
    pub async fn prune_stale(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM listings WHERE last_seen < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
