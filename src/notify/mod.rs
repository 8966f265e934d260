pub mod ntfy;
pub mod telegram;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::{Config, NtfyConfig, TelegramConfig, REQUEST_TIMEOUT_SECS};
use crate::error::Result;

/// Fans rendered alerts out to every enabled channel. Delivery problems are
/// logged and swallowed: a dead chat endpoint must not stop a scan.
pub struct Notifier {
    client: reqwest::Client,
    telegram: Option<TelegramConfig>,
    ntfy: Option<NtfyConfig>,
}

impl Notifier {
    /// Build from config. The off switches mute a channel for this run
    /// without touching its stored credentials.
    pub fn new(cfg: &Config, telegram_off: bool, ntfy_off: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let notifier = Self {
            client,
            telegram: if telegram_off { None } else { cfg.telegram.clone() },
            ntfy: if ntfy_off { None } else { cfg.ntfy.clone() },
        };
        if notifier.channel_count() == 0 {
            info!("No notification channel enabled; alerts will only be logged");
        }
        Ok(notifier)
    }

    pub fn channel_count(&self) -> usize {
        usize::from(self.telegram.is_some()) + usize::from(self.ntfy.is_some())
    }

    /// Deliver a batch of rendered alerts to every enabled channel, in
    /// batch order.
    pub async fn send_batch(&self, messages: &[String]) {
        for message in messages {
            if let Some(telegram) = &self.telegram {
                if let Err(e) = telegram::send(&self.client, telegram, message).await {
                    warn!("Telegram delivery failed: {e}");
                }
            }
            if let Some(ntfy) = &self.ntfy {
                if let Err(e) = ntfy::send(&self.client, ntfy, message).await {
                    warn!("ntfy delivery failed: {e}");
                }
            }
        }
    }
}
