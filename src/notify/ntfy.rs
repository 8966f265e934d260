use crate::config::NtfyConfig;
use crate::error::Result;

/// Publish one message to the configured topic.
pub async fn send(client: &reqwest::Client, cfg: &NtfyConfig, text: &str) -> Result<()> {
    let url = format!("{}/{}", cfg.server.trim_end_matches('/'), cfg.topic);
    client
        .post(&url)
        .body(text.to_string())
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
