//! Single-attempt HTTP delivery of notification payloads.

use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::SlackConfig;
use crate::error::Result;
use crate::payload::NotificationPayload;

/// Result of one delivery attempt. None of these are fatal to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Endpoint answered 200.
    Delivered,
    /// Endpoint answered with any other status.
    RemoteRejected { status: u16, body: String },
    /// The request could not be built, sent or answered.
    TransportFailed { error: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => f.write_str("delivered"),
            DeliveryOutcome::RemoteRejected { status, .. } => write!(f, "rejected ({})", status),
            DeliveryOutcome::TransportFailed { error } => write!(f, "transport failed: {}", error),
        }
    }
}

/// Build the HTTP client shared by delivery and user lookups.
pub fn build_http_client(config: &SlackConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("slack_status_push/", env!("CARGO_PKG_VERSION")))
        .connection_verbose(config.debug)
        .danger_accept_invalid_certs(!config.verify);
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    endpoint: String,
    verbose: bool,
}

impl DeliveryClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            verbose: false,
        }
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self> {
        let client = build_http_client(config)?;
        Ok(Self::new(client, config.endpoint.clone()).with_verbose(config.verbose))
    }

    /// Log every payload body before posting it.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST `payload` once. Never retries.
    pub async fn deliver(&self, payload: &NotificationPayload) -> DeliveryOutcome {
        let body = match payload.to_json() {
            Ok(body) => body,
            Err(e) => {
                return DeliveryOutcome::TransportFailed {
                    error: e.to_string(),
                };
            }
        };

        info!("posting to {}", self.endpoint);
        if self.verbose {
            info!("payload: {}", body);
        } else {
            debug!("payload: {}", body);
        }

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                return DeliveryOutcome::TransportFailed {
                    error: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status == StatusCode::OK {
            return DeliveryOutcome::Delivered;
        }

        let content = response.text().await.unwrap_or_default();
        error!("{}: unable to upload status: {}", status.as_u16(), content);
        DeliveryOutcome::RemoteRejected {
            status: status.as_u16(),
            body: content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(DeliveryOutcome::Delivered.to_string(), "delivered");
        assert_eq!(
            DeliveryOutcome::RemoteRejected {
                status: 404,
                body: "no_team".to_string()
            }
            .to_string(),
            "rejected (404)"
        );
        assert!(DeliveryOutcome::Delivered.is_delivered());
        assert!(
            !DeliveryOutcome::TransportFailed {
                error: "refused".to_string()
            }
            .is_delivered()
        );
    }

    #[test]
    fn test_client_from_config() {
        let mut config = SlackConfig::new("http://127.0.0.1:9/hook");
        config.timeout_secs = Some(2);
        config.verbose = true;
        let client = DeliveryClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/hook");
        assert!(client.verbose);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_transport_failure() {
        let client = DeliveryClient::new(reqwest::Client::new(), "not a url");
        let payload = NotificationPayload {
            text: "hi".to_string(),
            ..Default::default()
        };
        let outcome = client.deliver(&payload).await;
        assert!(matches!(outcome, DeliveryOutcome::TransportFailed { .. }));
    }
}
