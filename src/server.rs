//! Read-only status and test-notification HTTP endpoints.
//!
//! `GET /status` reports list sizes and the sent counter; `GET /notify`
//! pushes a test message through one or all configured services so
//! operators can verify credentials without waiting for a real alert.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dispatcher::{EnvelopeSender, HttpSender};
use crate::engine::Engine;
use crate::queue::Envelope;
use crate::template::TemplateData;

#[derive(Debug, Serialize)]
struct StatusResponse {
    safe_list_count: usize,
    risk_list_count: usize,
    risk_list_status: HashMap<String, usize>,
    notifications_sent: u64,
    config_in_json: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct NotifyResponse {
    status: &'static str,
    message: String,
}

#[derive(Debug, Deserialize)]
struct NotifyParams {
    service: Option<String>,
}

/// Serve until shutdown is signalled.
pub async fn run(
    engine: Arc<Engine>,
    listen: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let app = Router::new()
        .route("/status", get(handle_status))
        .route("/notify", get(handle_notify))
        .with_state(engine);

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind status server to {}", listen))?;
    info!("Status server listening on {}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("Status server failed")
}

async fn handle_status(State(engine): State<Arc<Engine>>) -> Json<StatusResponse> {
    let config_in_json =
        serde_json::to_value(engine.config()).unwrap_or(serde_json::Value::Null);
    Json(StatusResponse {
        safe_list_count: engine.safe_list.total_len(),
        risk_list_count: engine.risk_list.total_len(),
        risk_list_status: engine.risk_list.member_counts(),
        notifications_sent: engine.notifications_sent(),
        config_in_json,
    })
}

async fn handle_notify(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<NotifyParams>,
) -> Json<Vec<NotifyResponse>> {
    let policies = engine.policies();

    let to_test: Vec<_> = match &params.service {
        Some(name) => {
            let matched: Vec<_> = policies
                .iter()
                .filter(|p| &p.service == name)
                .cloned()
                .collect();
            if matched.is_empty() {
                return Json(vec![NotifyResponse {
                    status: "failure",
                    message: format!("Service '{}' not found in configuration", name),
                }]);
            }
            matched
        }
        None => policies,
    };
    if to_test.is_empty() {
        return Json(vec![NotifyResponse {
            status: "failure",
            message: "No notification services configured".to_string(),
        }]);
    }

    let sender = match HttpSender::new() {
        Ok(sender) => sender,
        Err(e) => {
            return Json(vec![NotifyResponse {
                status: "failure",
                message: format!("Failed to build HTTP client: {}", e),
            }]);
        }
    };

    let mut responses = Vec::with_capacity(to_test.len());
    for policy in to_test {
        let service = policy.service.clone();
        let envelope = Envelope {
            policy,
            title: "Test Notification".to_string(),
            body: format!(
                "Test notification from riskwatch at {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
            data: TemplateData::default(),
            retry_count: 0,
        };
        match sender.send(&envelope).await {
            Ok(()) => {
                info!("API test notification to {} sent successfully", service);
                responses.push(NotifyResponse {
                    status: "success",
                    message: format!("Notification sent successfully to [{}]", service),
                });
            }
            Err(e) => {
                warn!("API test notification to {} failed: {:#}", service, e);
                responses.push(NotifyResponse {
                    status: "failure",
                    message: format!("Failed to send notification to [{}]: {:#}", service, e),
                });
            }
        }
    }
    Json(responses)
}
