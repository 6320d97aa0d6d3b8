//! Wire payload for the chat incoming-webhook API.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::attachments::Attachment;
use crate::config::SlackConfig;
use crate::error::Result;
use crate::report::Build;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(rename = "user_name", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Additional top-level keys, merged over the ones above.
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl NotificationPayload {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.channel.is_none()
            && self.username.is_none()
            && self.attachments.is_none()
            && self.extra.is_empty()
    }

    /// JSON body as posted to the endpoint.
    pub fn to_json(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            for (key, extra) in &self.extra {
                map.insert(key.clone(), extra.clone());
            }
        }
        Ok(value)
    }
}

/// Hook for contributing extra top-level payload keys per build.
pub trait ExtraParams: Send + Sync {
    fn extra_params(&self, build: &Build) -> Map<String, Value>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtraParams;

impl ExtraParams for NoExtraParams {
    fn extra_params(&self, _build: &Build) -> Map<String, Value> {
        Map::new()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

pub fn assemble_payload(
    config: &SlackConfig,
    text: String,
    attachments: Vec<Attachment>,
    extra: Map<String, Value>,
) -> NotificationPayload {
    NotificationPayload {
        text,
        channel: non_empty(&config.channel),
        username: non_empty(&config.username),
        attachments: (config.attachments && !attachments.is_empty()).then_some(attachments),
        extra,
    }
}
