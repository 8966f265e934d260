use std::time::Duration;

use chrono::Utc;

use crate::config::{ACCEPT_LANGUAGE, REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::error::Result;

/// HTTP client for result-page fetches. One instance lives for the whole
/// process so the site sees a stable session (cookies, keep-alive) instead
/// of a fresh client per request.
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch one result page of a search query. `page` is 1-based; page 1 is
    /// the bare query URL. Non-2xx statuses surface as errors.
    pub async fn fetch_page(&self, query_url: &str, page: u32) -> Result<String> {
        let url = build_page_url(query_url, page, Utc::now().timestamp());
        let body = self
            .client
            .get(&url)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .header("Cache-Control", "no-cache")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Append the page selector and a cache-busting timestamp to a query URL.
/// Pages past the first add `o={page}`; every request carries a fresh
/// `t={unix}` so intermediaries cannot serve a cached copy.
fn build_page_url(query_url: &str, page: u32, bust: i64) -> String {
    let sep = if query_url.contains('?') { '&' } else { '?' };
    if page <= 1 {
        format!("{query_url}{sep}t={bust}")
    } else {
        format!("{query_url}{sep}o={page}&t={bust}")
    }
}
