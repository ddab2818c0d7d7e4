//! Curl-style adapter for plain HTTP endpoints.
//!
//! POST sends the rendered body as-is; every other method URL-encodes the
//! title and message as query parameters, for endpoints that take alerts
//! through the query string (Gotify-style relays, home-automation hooks).

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Configuration for the curl adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurlConfig {
    pub url: String,
    /// HTTP method, default GET
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

pub struct CurlNotifier {
    config: CurlConfig,
}

impl CurlNotifier {
    pub fn new(config: CurlConfig) -> Self {
        Self { config }
    }

    fn method(&self) -> Method {
        match self.config.method.to_uppercase().as_str() {
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            // unknown methods fall back to GET
            _ => Method::GET,
        }
    }

    pub async fn send(&self, client: &Client, title: &str, body: &str) -> Result<()> {
        let method = self.method();

        let request = if method == Method::POST {
            debug!("Curl request: method=POST url={}", self.config.url);
            client.post(&self.config.url).body(body.to_string())
        } else {
            let mut url = Url::parse(&self.config.url)
                .with_context(|| format!("Invalid curl url: {}", self.config.url))?;
            url.query_pairs_mut()
                .append_pair("title", title)
                .append_pair("message", body);
            debug!("Curl request: method={} url={}", method, url);
            client.request(method, url)
        };

        let request = self
            .config
            .headers
            .iter()
            .fold(request, |req, (key, value)| {
                req.header(key.as_str(), value.as_str())
            });

        let response = request.send().await.context("Curl request failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("curl request failed, status: {}", status);
        }
        Ok(())
    }
}
