// src/push.rs

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;

use crate::config::Config;

/// Payload accepted by the push gateway.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub notification: PushNotification,
    pub data: PushData,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushData {
    pub link: String,
}

impl PushMessage {
    pub fn new(token: String, title: String, body: String, link: Option<String>) -> Self {
        PushMessage {
            token,
            notification: PushNotification { title, body },
            data: PushData {
                link: link.unwrap_or_default(),
            },
        }
    }
}

/// Result of a single delivery attempt. Push is best-effort throughout: the
/// gateway never returns an error, callers only log what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    /// The gateway is not configured; delivery was skipped.
    Unavailable,
    Failed(String),
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: PushMessage) -> PushOutcome;
}

/// HTTP client for the FCM legacy send endpoint.
pub struct FcmGateway {
    client: reqwest::Client,
    endpoint: String,
    server_key: Option<String>,
}

impl FcmGateway {
    pub fn new(config: &Config) -> Self {
        FcmGateway {
            client: reqwest::Client::new(),
            endpoint: config.fcm_endpoint.clone(),
            server_key: config.fcm_server_key.clone(),
        }
    }
}

#[async_trait]
impl PushSender for FcmGateway {
    async fn send(&self, message: PushMessage) -> PushOutcome {
        let server_key = match &self.server_key {
            Some(key) => key,
            None => {
                debug!("push gateway not configured, skipping delivery");
                return PushOutcome::Unavailable;
            }
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", server_key))
            .json(&message)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => PushOutcome::Sent,
            Ok(resp) => {
                warn!("push gateway rejected message: {}", resp.status());
                PushOutcome::Failed(format!("gateway status {}", resp.status()))
            }
            Err(e) => {
                warn!("push gateway unreachable: {}", e);
                PushOutcome::Failed(e.to_string())
            }
        }
    }
}
