//! Lead text line of a notification.

use serde::Deserialize;
use std::fmt;

use crate::config::SlackConfig;
use crate::report::{Build, BuildReport};

/// Lifecycle event that triggered the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    BuildStarted,
    BuildFinished,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::BuildStarted => f.write_str("build-started"),
            EventKind::BuildFinished => f.write_str("build-finished"),
        }
    }
}

/// Report body, or the configured default for the event when it is empty.
pub fn message_body<'a>(config: &'a SlackConfig, report: &'a BuildReport, kind: EventKind) -> &'a str {
    if !report.body.trim().is_empty() {
        return &report.body;
    }
    match kind {
        EventKind::BuildStarted => &config.messages.started,
        EventKind::BuildFinished => &config.messages.finished,
    }
}

/// `<emoji> <body>`, followed by the build URL when attachments are off.
pub fn format_message(config: &SlackConfig, build: &Build, body: &str) -> String {
    let mut text = format!("{} {}", build.results.emoji(), body);
    if !config.attachments {
        text.push_str("\n here: ");
        text.push_str(&build.url);
    }
    text
}
