use crate::config::TelegramConfig;
use crate::error::Result;

/// Send one message through the Bot API. Markdown parse mode matches the
/// light markup used in rendered alerts.
pub async fn send(client: &reqwest::Client, cfg: &TelegramConfig, text: &str) -> Result<()> {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", cfg.bot_token);
    client
        .get(&url)
        .query(&[
            ("chat_id", cfg.chat_id.as_str()),
            ("parse_mode", "Markdown"),
            ("text", text),
        ])
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
