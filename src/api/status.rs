//! Service status and recent logs.

use axum::{
    Json,
    extract::{Query, State as AxumState},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_core::Level;

use crate::SharedState;
use crate::logging::LogEntry;

const DEFAULT_LOG_LIMIT: usize = 100;

pub async fn root() -> &'static str {
    "slack_status_push"
}

#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub name: String,
    pub version: String,
    pub started_at: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct NotifierStatus {
    /// Endpoint host only; the full webhook URL is a credential.
    pub endpoint_host: Option<String>,
    pub channel: Option<String>,
    pub attachments: bool,
    pub builders: Option<Vec<String>>,
    pub codebases: Option<Vec<String>>,
    pub responsible_user_lookup: bool,
    pub signed_events: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub server: ServerStatus,
    pub notifier: NotifierStatus,
}

fn sorted(set: &Option<std::collections::HashSet<String>>) -> Option<Vec<String>> {
    set.as_ref().map(|s| {
        let mut values: Vec<String> = s.iter().cloned().collect();
        values.sort();
        values
    })
}

/// GET /status - Server and notifier status
pub async fn status(AxumState(state): AxumState<SharedState>) -> Json<StatusResponse> {
    let slack = state.notifier.config();

    let server = ServerStatus {
        name: "slack_status_push".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at.to_rfc3339(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    let notifier = NotifierStatus {
        endpoint_host: reqwest::Url::parse(&slack.endpoint)
            .ok()
            .and_then(|url| url.host_str().map(String::from)),
        channel: slack.channel.clone(),
        attachments: slack.attachments,
        builders: sorted(&slack.builder),
        codebases: sorted(&slack.codebases),
        responsible_user_lookup: state.config.responsible_users.api_url.is_some(),
        signed_events: state
            .config
            .server
            .event_secret
            .as_deref()
            .is_some_and(|s| !s.is_empty()),
    };

    Json(StatusResponse { server, notifier })
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub level: Option<String>,
}

/// GET /logs?limit=N&level=L - Most recent log entries, oldest first
pub async fn get_logs(
    AxumState(state): AxumState<SharedState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntry>>, StatusCode> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let entries = match query.level.as_deref() {
        None => state.log_buffer.recent(limit),
        Some(level) => {
            let level = Level::from_str(level).map_err(|_| StatusCode::BAD_REQUEST)?;
            state.log_buffer.by_level(level, limit)
        }
    };
    Ok(Json(entries))
}
