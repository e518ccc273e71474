//! Webhook sender for HTTP message delivery.

use crate::{SenderError, SenderResult};
use async_trait::async_trait;
use dispatch_core::{DeliveryEndpoint, DispatchResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Header carrying the webhook auth key.
pub const AUTH_HEADER: &str = "x-ins-auth-key";

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Full URL messages are POSTed to.
    pub url: String,
    /// Sent as [`AUTH_HEADER`] when present and non-empty.
    pub auth_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_key: None,
            timeout_secs: 10,
        }
    }
}

/// Request payload for one message.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendRequest {
    pub to: String,
    pub content: String,
}

/// Response from the webhook.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "messageId", default)]
    pub message_id: Option<String>,
}

/// HTTP delivery endpoint.
pub struct WebhookSender {
    config: SenderConfig,
    client: Client,
}

impl WebhookSender {
    pub fn new(config: SenderConfig) -> SenderResult<Self> {
        if config.url.is_empty() {
            return Err(SenderError::Config("webhook URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// POST one message and return the webhook's message identifier.
    pub async fn send_message(&self, to: &str, content: &str) -> SenderResult<String> {
        let request = SendRequest {
            to: to.to_string(),
            content: content.to_string(),
        };

        debug!(url = %self.config.url, to = %to, "Sending message to webhook");

        let mut builder = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = self.config.auth_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.header(AUTH_HEADER, key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SenderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let result: SendResponse = serde_json::from_str(&body)?;

        match result.message_id {
            Some(id) if !id.is_empty() => {
                debug!(message_id = %id, message = %result.message, "Webhook accepted message");
                Ok(id)
            }
            _ => Err(SenderError::MissingMessageId),
        }
    }
}

#[async_trait]
impl DeliveryEndpoint for WebhookSender {
    async fn send(&self, recipient: &str, content: &str) -> DispatchResult<String> {
        Ok(self.send_message(recipient, content).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Seen {
        requests: Vec<(Option<String>, SendRequest)>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/send", addr)
    }

    async fn accepting_webhook(message_id: &'static str) -> (String, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let seen_in_handler = seen.clone();
        let router = Router::new().route(
            "/send",
            post(move |headers: HeaderMap, Json(body): Json<SendRequest>| {
                let seen = seen_in_handler.clone();
                async move {
                    let key = headers
                        .get(AUTH_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().requests.push((key, body));
                    (
                        StatusCode::ACCEPTED,
                        Json(serde_json::json!({
                            "message": "Accepted",
                            "messageId": message_id,
                        })),
                    )
                }
            }),
        );
        (serve(router).await, seen)
    }

    fn sender(url: String, auth_key: Option<&str>) -> WebhookSender {
        WebhookSender::new(SenderConfig {
            url,
            auth_key: auth_key.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_sender_config_default() {
        let config = SenderConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert!(config.auth_key.is_none());
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let result = WebhookSender::new(SenderConfig::default());
        assert!(matches!(result, Err(SenderError::Config(_))));
    }

    #[tokio::test]
    async fn test_send_returns_message_id_and_sends_auth_header() {
        let (url, seen) = accepting_webhook("ext-12345").await;
        let sender = sender(url, Some("secret"));

        let id = sender.send_message("+1111111", "Hello").await.unwrap();

        assert_eq!(id, "ext-12345");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.requests.len(), 1);
        let (key, body) = &seen.requests[0];
        assert_eq!(key.as_deref(), Some("secret"));
        assert_eq!(
            body,
            &SendRequest {
                to: "+1111111".to_string(),
                content: "Hello".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_auth_key_omits_header() {
        let (url, seen) = accepting_webhook("ext-1").await;
        let sender = sender(url, Some(""));

        sender.send_message("+1", "hi").await.unwrap();

        assert!(seen.lock().unwrap().requests[0].0.is_none());
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let router = Router::new().route(
            "/send",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let sender = sender(serve(router).await, None);

        let err = sender.send_message("+1", "hi").await.unwrap_err();

        match err {
            SenderError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_message_id_is_an_error() {
        let (url, _seen) = accepting_webhook("").await;
        let sender = sender(url, None);

        let err = sender.send_message("+1", "hi").await.unwrap_err();
        assert!(matches!(err, SenderError::MissingMessageId));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let router = Router::new().route("/send", post(|| async { "not json" }));
        let sender = sender(serve(router).await, None);

        let err = sender.send_message("+1", "hi").await.unwrap_err();
        assert!(matches!(err, SenderError::Json(_)));
    }

    #[tokio::test]
    async fn test_trait_maps_errors_to_send_failures() {
        let (url, _seen) = accepting_webhook("").await;
        let endpoint: dispatch_core::DeliveryEndpointHandle = Arc::new(sender(url, None));

        let err = endpoint.send("+1", "hi").await.unwrap_err();
        assert!(matches!(err, dispatch_core::DispatchError::EmptyDeliveryId));
    }
}
