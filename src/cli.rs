use clap::Parser;

use crate::config::DEFAULT_POLL_DELAY_SECS;

/// Watches saved marketplace searches, stores every listing seen, and flags
/// statistically unusual prices.
#[derive(Parser, Debug)]
#[command(name = "subito-scanner", version, about)]
pub struct Args {
    /// Add or update a tracked search (requires --url)
    #[arg(long, value_name = "NAME", requires = "url")]
    pub add: Option<String>,

    /// Query URL for the search being added
    #[arg(long, value_name = "URL", requires = "add")]
    pub url: Option<String>,

    /// Minimum price bound for the search being added
    #[arg(long, value_name = "EUR", requires = "add")]
    pub min_price: Option<i64>,

    /// Maximum price bound for the search being added
    #[arg(long, value_name = "EUR", requires = "add")]
    pub max_price: Option<i64>,

    /// Delete a tracked search and all of its stored listings
    #[arg(long, value_name = "NAME")]
    pub delete: Option<String>,

    /// Exclude a tracked search from scans without deleting its history
    #[arg(long, value_name = "NAME")]
    pub pause: Option<String>,

    /// Re-include a paused search in scans
    #[arg(long, value_name = "NAME")]
    pub resume: Option<String>,

    /// Print every tracked search with its stored listings
    #[arg(long)]
    pub list: bool,

    /// Print a one-line-per-search summary
    #[arg(long)]
    pub short_list: bool,

    /// Scan every active search once, with notifications
    #[arg(short, long)]
    pub refresh: bool,

    /// Keep scanning on a fixed delay until interrupted
    #[arg(short, long)]
    pub daemon: bool,

    /// Hour of day when daemon scanning starts
    #[arg(long, value_name = "HOUR", default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..24))]
    pub active_hour: u32,

    /// Hour of day when daemon scanning pauses (equal to --active-hour means always on)
    #[arg(long, value_name = "HOUR", default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..24))]
    pub pause_hour: u32,

    /// Seconds between daemon poll cycles
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_POLL_DELAY_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub delay: u64,

    /// Skip Telegram delivery for this run
    #[arg(long)]
    pub telegram_off: bool,

    /// Skip ntfy delivery for this run
    #[arg(long)]
    pub ntfy_off: bool,
}

impl Args {
    /// True when no action flag was given and there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.add.is_none()
            && self.delete.is_none()
            && self.pause.is_none()
            && self.resume.is_none()
            && !self.list
            && !self.short_list
            && !self.refresh
            && !self.daemon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_requires_add() {
        let res = Args::try_parse_from(["scanner", "--url", "https://example.org/q"]);
        assert!(res.is_err(), "--url without --add should be rejected");
    }

    #[test]
    fn add_requires_url() {
        let res = Args::try_parse_from(["scanner", "--add", "bikes"]);
        assert!(res.is_err(), "--add without --url should be rejected");
    }

    #[test]
    fn add_with_bounds_parses() {
        let args = Args::try_parse_from([
            "scanner",
            "--add",
            "bikes",
            "--url",
            "https://example.org/q",
            "--min-price",
            "50",
            "--max-price",
            "400",
        ])
        .unwrap();
        assert_eq!(args.add.as_deref(), Some("bikes"));
        assert_eq!(args.min_price, Some(50));
        assert_eq!(args.max_price, Some(400));
        assert!(!args.is_empty());
    }

    #[test]
    fn hour_out_of_range_rejected() {
        let res = Args::try_parse_from(["scanner", "--daemon", "--active-hour", "24"]);
        assert!(res.is_err());
    }

    #[test]
    fn defaults_mean_empty_invocation() {
        let args = Args::try_parse_from(["scanner"]).unwrap();
        assert!(args.is_empty());
        assert_eq!(args.delay, DEFAULT_POLL_DELAY_SECS);
        assert_eq!(args.active_hour, 0);
        assert_eq!(args.pause_hour, 0);
    }
}
