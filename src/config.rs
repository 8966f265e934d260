use crate::error::{AppError, Result};

/// Browser-like identity for result-page fetches. The listing site serves a
/// different (and sparser) payload to clients it does not recognize.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";

/// Accept-Language sent with every page fetch. Keeps the site serving the
/// Italian market feed instead of a localized redirect.
pub const ACCEPT_LANGUAGE: &str = "it-IT,it;q=0.9";

/// Per-request timeout (seconds) for page fetches and notification delivery.
pub const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Result pages walked per search scan. Pagination stops earlier when a page
/// comes back empty or without a data block.
pub const RESULT_PAGE_LIMIT: u32 = 5;

/// Randomized pause bounds (seconds) before each page request.
pub const PACING_MIN_SECS: f64 = 3.0;
pub const PACING_MAX_SECS: f64 = 7.0;

/// Listings unseen for this many days are assumed gone and pruned.
pub const STALE_AFTER_DAYS: i64 = 30;

/// Observation window (days) feeding the per-search market model.
pub const MODEL_LOOKBACK_DAYS: i64 = 21;

/// Newest-first cap on samples fed into the market model.
pub const MODEL_MAX_SAMPLES: i64 = 200;

/// Minimum raw samples before a market model exists at all.
pub const MODEL_MIN_RAW_SAMPLES: usize = 20;

/// Minimum samples surviving the IQR trim. Below this the model is discarded
/// rather than built from a hollowed-out sample.
pub const MODEL_MIN_TRIMMED_SAMPLES: usize = 10;

/// Fence multiplier for the IQR outlier trim.
pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;

/// Default seconds between daemon poll cycles.
pub const DEFAULT_POLL_DELAY_SECS: u64 = 120;

/// Upper price bound meaning "unbounded". Stored verbatim so bound checks
/// stay plain integer comparisons.
pub const MAX_PRICE_SENTINEL: i64 = 99_999;

/// Z-score cutoffs for deal tiers. A candidate qualifies for the deepest
/// tier whose cutoff its z-score reaches.
pub mod z_thresholds {
    pub const IMPERATIVE: f64 = -2.0;
    pub const STRONG: f64 = -1.5;
    pub const GOOD: f64 = -1.0;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    /// Telegram delivery credentials (TELEGRAM_BOT_TOKEN + TELEGRAM_CHAT_ID).
    /// None when neither variable is set.
    pub telegram: Option<TelegramConfig>,
    /// ntfy delivery target (NTFY_TOPIC, optionally NTFY_SERVER).
    /// None when no topic is set.
    pub ntfy: Option<NtfyConfig>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct NtfyConfig {
    pub server: String,
    pub topic: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("LOG_LEVEL").ok(),
            std::env::var("DB_PATH").ok(),
            std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
            std::env::var("NTFY_SERVER").ok(),
            std::env::var("NTFY_TOPIC").ok(),
        )
    }

    /// Assemble from raw variable values. Telegram needs both variables and
    /// a half-set pair is a configuration error; ntfy needs only a topic,
    /// the server falls back to the public instance.
    fn from_vars(
        log_level: Option<String>,
        db_path: Option<String>,
        telegram_token: Option<String>,
        telegram_chat_id: Option<String>,
        ntfy_server: Option<String>,
        ntfy_topic: Option<String>,
    ) -> Result<Self> {
        let telegram = match (telegram_token, telegram_chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            (None, None) => None,
            _ => {
                return Err(AppError::Config(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string(),
                ))
            }
        };
        let ntfy = ntfy_topic.map(|topic| NtfyConfig {
            server: ntfy_server.unwrap_or_else(|| "https://ntfy.sh".to_string()),
            topic,
        });
        Ok(Self {
            log_level: log_level.unwrap_or_else(|| "info".to_string()),
            db_path: db_path.unwrap_or_else(|| "listings.db".to_string()),
            telegram,
            ntfy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(
        token: Option<&str>,
        chat_id: Option<&str>,
        server: Option<&str>,
        topic: Option<&str>,
    ) -> Result<Config> {
        Config::from_vars(
            None,
            None,
            token.map(str::to_string),
            chat_id.map(str::to_string),
            server.map(str::to_string),
            topic.map(str::to_string),
        )
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = assemble(None, None, None, None).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.db_path, "listings.db");
        assert!(cfg.telegram.is_none());
        assert!(cfg.ntfy.is_none());
    }

    #[test]
    fn telegram_needs_the_full_pair() {
        let cfg = assemble(Some("token"), Some("42"), None, None).unwrap();
        let telegram = cfg.telegram.unwrap();
        assert_eq!(telegram.bot_token, "token");
        assert_eq!(telegram.chat_id, "42");

        assert!(matches!(
            assemble(Some("token"), None, None, None),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            assemble(None, Some("42"), None, None),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn ntfy_topic_alone_gets_the_public_server() {
        let cfg = assemble(None, None, None, Some("deals")).unwrap();
        let ntfy = cfg.ntfy.unwrap();
        assert_eq!(ntfy.server, "https://ntfy.sh");
        assert_eq!(ntfy.topic, "deals");

        let cfg = assemble(None, None, Some("https://ntfy.example.org"), Some("deals")).unwrap();
        assert_eq!(cfg.ntfy.unwrap().server, "https://ntfy.example.org");

        let cfg = assemble(None, None, Some("https://ntfy.example.org"), None).unwrap();
        assert!(cfg.ntfy.is_none(), "a server without a topic enables nothing");
    }
}
