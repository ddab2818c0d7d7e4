//! Generic webhook adapter.
//!
//! Posts the rendered payload to a configured URL. When the payload is
//! itself a JSON object it goes out untouched, so operators can shape the
//! request body entirely from the template; anything else is wrapped in a
//! `{"title": …, "message": …}` envelope.

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Configuration for the webhook adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: String,
    /// HTTP method, default POST
    #[serde(default = "default_method")]
    pub method: String,
    /// Content-Type header, default application/json
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_content_type() -> String {
    "application/json".to_string()
}

pub struct WebhookNotifier {
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    fn build_payload(&self, title: &str, body: &str) -> String {
        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(body) {
            Ok(object) => serde_json::Value::Object(object).to_string(),
            Err(_) => serde_json::json!({ "title": title, "message": body }).to_string(),
        }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let method = Method::from_bytes(self.config.method.to_uppercase().as_bytes())
            .unwrap_or(Method::POST);
        debug!(
            "Webhook request: method={} url={} content_type={}",
            method, self.config.url, self.config.content_type
        );

        let mut request = client
            .request(method, &self.config.url)
            .header("Content-Type", &self.config.content_type)
            .body(self.build_payload(title, body));
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await.context("Failed to send webhook")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("webhook returned {}", status);
        }
        Ok(())
    }
}
