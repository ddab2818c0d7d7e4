//! Push-service adapters: Bark, Pushover, Pushbullet, WeChat, Web Push.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BarkConfig {
    /// Device key
    pub key: String,
    /// Self-hosted server URL; defaults to the public bark server
    #[serde(default)]
    pub server_url: Option<String>,
}

pub struct BarkNotifier {
    config: BarkConfig,
}

impl BarkNotifier {
    pub fn new(config: BarkConfig) -> Self {
        Self { config }
    }

    fn server(&self) -> &str {
        self.config
            .server_url
            .as_deref()
            .unwrap_or("https://api.day.app")
            .trim_end_matches('/')
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let url = format!("{}/push", self.server());
        let payload = serde_json::json!({
            "device_key": self.config.key,
            "title": title,
            "body": body,
        });
        let response = client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Bark server")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Bark server returned {}", status);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushoverConfig {
    /// Application token
    pub token: String,
    #[serde(default)]
    pub user_key: Option<String>,
}

pub struct PushoverNotifier {
    config: PushoverConfig,
}

impl PushoverNotifier {
    pub fn new(config: PushoverConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let Some(user_key) = &self.config.user_key else {
            debug!("Pushover: no user_key configured, nothing to send");
            return Ok(());
        };

        let params = [
            ("token", self.config.token.as_str()),
            ("user", user_key.as_str()),
            ("title", title),
            ("message", body),
        ];
        let response = client
            .post("https://api.pushover.net/1/messages.json")
            .form(&params)
            .send()
            .await
            .context("Failed to reach Pushover API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Pushover API returned {}", status);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushbulletConfig {
    /// Access token
    pub token: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

pub struct PushbulletNotifier {
    config: PushbulletConfig,
}

impl PushbulletNotifier {
    pub fn new(config: PushbulletConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let mut payload = serde_json::json!({
            "type": "note",
            "title": title,
            "body": body,
        });
        if let Some(device) = &self.config.device_id {
            payload["device_iden"] = serde_json::Value::String(device.clone());
        }

        let response = client
            .post("https://api.pushbullet.com/v2/pushes")
            .header("Access-Token", &self.config.token)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Pushbullet API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Pushbullet API returned {}", status);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeChatConfig {
    pub app_id: String,
    pub app_secret: String,
    #[serde(default)]
    pub open_id: Option<String>,
}

pub struct WeChatNotifier {
    config: WeChatConfig,
}

#[derive(Debug, Deserialize)]
struct WeChatTokenResponse {
    access_token: Option<String>,
    errmsg: Option<String>,
}

impl WeChatNotifier {
    pub fn new(config: WeChatConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let Some(open_id) = &self.config.open_id else {
            debug!("WeChat: no open_id configured, nothing to send");
            return Ok(());
        };

        let token_url = format!(
            "https://api.weixin.qq.com/cgi-bin/token?grant_type=client_credential&appid={}&secret={}",
            self.config.app_id, self.config.app_secret
        );
        let token: WeChatTokenResponse = client
            .get(&token_url)
            .send()
            .await
            .context("Failed to reach WeChat token API")?
            .json()
            .await
            .context("Failed to parse WeChat token response")?;
        let access_token = token.access_token.ok_or_else(|| {
            anyhow::anyhow!(
                "WeChat token error: {}",
                token.errmsg.unwrap_or_else(|| "unknown".to_string())
            )
        })?;

        let send_url = format!(
            "https://api.weixin.qq.com/cgi-bin/message/custom/send?access_token={}",
            access_token
        );
        let payload = serde_json::json!({
            "touser": open_id,
            "msgtype": "text",
            "text": { "content": format!("{}\n{}", title, body) },
        });
        let response = client
            .post(&send_url)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach WeChat send API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("WeChat API returned {}", status);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebPushConfig {
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    /// Push-service subscription endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
}

pub struct WebPushNotifier {
    config: WebPushConfig,
}

impl WebPushNotifier {
    pub fn new(config: WebPushConfig) -> Self {
        Self { config }
    }

    /// Send a payload-less push: the subscriber fetches alert details on
    /// wake. Payload encryption is out of scope here.
    pub async fn send(&self, client: &Client, _title: &str, _body: &str) -> Result<()> {
        let Some(endpoint) = &self.config.endpoint else {
            debug!("WebPush: no endpoint configured, nothing to send");
            return Ok(());
        };

        let response = client
            .post(endpoint)
            .header("TTL", "60")
            .send()
            .await
            .context("Failed to reach push endpoint")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Push endpoint returned {}", status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bark_default_server() {
        let notifier = BarkNotifier::new(BarkConfig {
            key: "k".to_string(),
            server_url: None,
        });
        assert_eq!(notifier.server(), "https://api.day.app");
    }

    #[test]
    fn test_bark_custom_server_trailing_slash_trimmed() {
        let notifier = BarkNotifier::new(BarkConfig {
            key: "k".to_string(),
            server_url: Some("https://bark.example.com/".to_string()),
        });
        assert_eq!(notifier.server(), "https://bark.example.com");
    }

    #[test]
    fn test_pushover_config_roundtrip() {
        let config = PushoverConfig {
            token: "app-token".to_string(),
            user_key: Some("user".to_string()),
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: PushoverConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_wechat_config_requires_app_fields() {
        let err = serde_yaml::from_str::<WeChatConfig>("app_id: only-id");
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_missing_receiver_is_noop_success() {
        let client = Client::new();
        let pushover = PushoverNotifier::new(PushoverConfig {
            token: "t".to_string(),
            user_key: None,
        });
        assert!(pushover.send(&client, "t", "b").await.is_ok());

        let wechat = WeChatNotifier::new(WeChatConfig {
            app_id: "a".to_string(),
            app_secret: "s".to_string(),
            open_id: None,
        });
        assert!(wechat.send(&client, "t", "b").await.is_ok());

        let webpush = WebPushNotifier::new(WebPushConfig {
            vapid_public_key: "pk".to_string(),
            vapid_private_key: "sk".to_string(),
            endpoint: None,
        });
        assert!(webpush.send(&client, "t", "b").await.is_ok());
    }
}
