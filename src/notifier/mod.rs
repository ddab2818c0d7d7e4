//! Service adapters for notification delivery.
//!
//! Every adapter exposes the same capability: `send(title, body)`. An
//! adapter is constructed per envelope from the policy's generic config
//! map; construction parses a strongly-typed config struct, so invalid
//! service settings surface as configuration errors instead of failing
//! on the send path.

mod chat;
mod curl;
mod push;
mod webhook;

pub use chat::{DiscordNotifier, RocketChatNotifier, SlackNotifier, TelegramNotifier};
pub use curl::CurlNotifier;
pub use push::{BarkNotifier, PushbulletNotifier, PushoverNotifier, WebPushNotifier, WeChatNotifier};
pub use webhook::WebhookNotifier;

use anyhow::Result;
use serde::de::DeserializeOwned;

use crate::config::NotificationPolicy;
use crate::error::WatchError;

/// One configured notification service, ready to send.
pub enum Notifier {
    Slack(SlackNotifier),
    Discord(DiscordNotifier),
    Webhook(WebhookNotifier),
    Bark(BarkNotifier),
    Telegram(TelegramNotifier),
    Pushover(PushoverNotifier),
    Pushbullet(PushbulletNotifier),
    RocketChat(RocketChatNotifier),
    WeChat(WeChatNotifier),
    WebPush(WebPushNotifier),
    Curl(CurlNotifier),
}

impl Notifier {
    /// Build the adapter named by `policy.service` from its config map.
    pub fn from_policy(policy: &NotificationPolicy) -> Result<Self, WatchError> {
        let notifier = match policy.service.to_lowercase().as_str() {
            "slack" => Self::Slack(SlackNotifier::new(typed_config(policy)?)),
            "discord" => Self::Discord(DiscordNotifier::new(typed_config(policy)?)),
            "webhook" => Self::Webhook(WebhookNotifier::new(typed_config(policy)?)),
            "bark" => Self::Bark(BarkNotifier::new(typed_config(policy)?)),
            "telegram" => Self::Telegram(TelegramNotifier::new(typed_config(policy)?)?),
            "pushover" => Self::Pushover(PushoverNotifier::new(typed_config(policy)?)),
            "pushbullet" => Self::Pushbullet(PushbulletNotifier::new(typed_config(policy)?)),
            "rocketchat" => Self::RocketChat(RocketChatNotifier::new(typed_config(policy)?)),
            "wechat" => Self::WeChat(WeChatNotifier::new(typed_config(policy)?)),
            "webpush" => Self::WebPush(WebPushNotifier::new(typed_config(policy)?)),
            "curl" => Self::Curl(CurlNotifier::new(typed_config(policy)?)),
            other => return Err(WatchError::UnsupportedService(other.to_string())),
        };
        Ok(notifier)
    }

    /// Deliver one notification. A single attempt; retry policy lives in
    /// the dispatcher.
    pub async fn send(&self, client: &reqwest::Client, title: &str, body: &str) -> Result<()> {
        match self {
            Self::Slack(n) => n.send(client, title, body).await,
            Self::Discord(n) => n.send(client, title, body).await,
            Self::Webhook(n) => n.send(client, title, body).await,
            Self::Bark(n) => n.send(client, title, body).await,
            Self::Telegram(n) => n.send(client, title, body).await,
            Self::Pushover(n) => n.send(client, title, body).await,
            Self::Pushbullet(n) => n.send(client, title, body).await,
            Self::RocketChat(n) => n.send(client, title, body).await,
            Self::WeChat(n) => n.send(client, title, body).await,
            Self::WebPush(n) => n.send(client, title, body).await,
            Self::Curl(n) => n.send(client, title, body).await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Slack(_) => "slack",
            Self::Discord(_) => "discord",
            Self::Webhook(_) => "webhook",
            Self::Bark(_) => "bark",
            Self::Telegram(_) => "telegram",
            Self::Pushover(_) => "pushover",
            Self::Pushbullet(_) => "pushbullet",
            Self::RocketChat(_) => "rocketchat",
            Self::WeChat(_) => "wechat",
            Self::WebPush(_) => "webpush",
            Self::Curl(_) => "curl",
        }
    }
}

/// Parse the policy's generic config map into an adapter's typed config.
fn typed_config<T: DeserializeOwned>(policy: &NotificationPolicy) -> Result<T, WatchError> {
    let mapping: serde_yaml::Mapping = policy
        .config
        .iter()
        .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.clone()))
        .collect();
    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).map_err(|e| {
        WatchError::Config(format!("service {} config: {}", policy.service, e))
    })
}
