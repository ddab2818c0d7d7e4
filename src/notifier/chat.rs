//! Chat-service adapters: Slack, Discord, Telegram, Rocket.Chat.
//!
//! Each adapter speaks its service's plain HTTP API. Receiver fields
//! (channel, chat id) are optional; with no receiver configured, a send
//! succeeds without issuing a request.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WatchError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlackConfig {
    pub token: String,
    #[serde(default)]
    pub channel: Option<String>,
}

pub struct SlackNotifier {
    config: SlackConfig,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let Some(channel) = &self.config.channel else {
            debug!("Slack: no channel configured, nothing to send");
            return Ok(());
        };

        let payload = serde_json::json!({
            "channel": channel,
            "text": format!("{}\n{}", title, body),
        });
        let response = client
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Slack API")?;

        let parsed: SlackResponse = response
            .json()
            .await
            .context("Failed to parse Slack response")?;
        if !parsed.ok {
            anyhow::bail!(
                "Slack API error: {}",
                parsed.error.unwrap_or_else(|| "unknown".to_string())
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscordConfig {
    /// Bot token
    pub token: String,
    /// Channel ID to post into
    #[serde(default)]
    pub channel: Option<String>,
}

pub struct DiscordNotifier {
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let Some(channel) = &self.config.channel else {
            debug!("Discord: no channel configured, nothing to send");
            return Ok(());
        };

        let url = format!("https://discord.com/api/v10/channels/{}/messages", channel);
        let payload = serde_json::json!({
            "content": format!("**{}**\n{}", title, body),
        });
        let response = client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.config.token))
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Discord API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Discord API returned {}", status);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Bot token
    pub token: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

pub struct TelegramNotifier {
    config: TelegramConfig,
    chat_id: Option<i64>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, WatchError> {
        let chat_id = match &config.chat_id {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                WatchError::Config(format!("telegram chat_id is not numeric: {}", raw))
            })?),
            None => None,
        };
        Ok(Self { config, chat_id })
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let Some(chat_id) = self.chat_id else {
            debug!("Telegram: no chat_id configured, nothing to send");
            return Ok(());
        };

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.token
        );
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": format!("{}\n{}", title, body),
        });
        let response = client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Telegram API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Telegram API returned {}", status);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RocketChatConfig {
    /// Server host, without scheme
    pub url: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub user_id: String,
    pub token: String,
    #[serde(default)]
    pub channel: Option<String>,
}

fn default_scheme() -> String {
    "https".to_string()
}

pub struct RocketChatNotifier {
    config: RocketChatConfig,
}

impl RocketChatNotifier {
    pub fn new(config: RocketChatConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let Some(channel) = &self.config.channel else {
            debug!("RocketChat: no channel configured, nothing to send");
            return Ok(());
        };

        let url = format!(
            "{}://{}/api/v1/chat.postMessage",
            self.config.scheme, self.config.url
        );
        let payload = serde_json::json!({
            "channel": channel,
            "text": format!("{}\n{}", title, body),
        });
        let response = client
            .post(&url)
            .header("X-Auth-Token", &self.config.token)
            .header("X-User-Id", &self.config.user_id)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Rocket.Chat API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Rocket.Chat API returned {}", status);
        }
        Ok(())
    }
}
