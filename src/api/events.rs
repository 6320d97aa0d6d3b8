//! Build lifecycle events pushed by the orchestrator.

use axum::{
    body::Bytes,
    extract::{Path, State as AxumState},
    http::{HeaderMap, StatusCode},
};
use tracing::{debug, error, info};

use crate::SharedState;
use crate::message::EventKind;
use crate::report::parse_reports;
use crate::utils::{SIGNATURE_HEADER, verify_signature};

/// POST /events/{kind} - Accepts a report (or list of reports) and runs the
/// notification pipeline in the background.
pub async fn handle_event(
    AxumState(state): AxumState<SharedState>,
    Path(kind): Path<EventKind>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state
        .config
        .server
        .event_secret
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
            error!("Event secret is configured, but no signature header supplied.");
            return StatusCode::UNAUTHORIZED;
        };
        if !verify_signature(secret, &body, signature) {
            error!("Signature verification failed for {} event!", kind);
            return StatusCode::UNAUTHORIZED;
        }
    }

    let reports = match parse_reports(&body) {
        Ok(reports) => reports,
        Err(e) => {
            info!("Could not parse {} event body: {}", kind, e);
            return StatusCode::BAD_REQUEST;
        }
    };

    if reports.is_empty() {
        debug!("Empty {} event, nothing to report.", kind);
        return StatusCode::NO_CONTENT;
    }

    // Respond right away; delivery outcome only ends up in the logs.
    let shared_state = state.clone();
    tokio::spawn(async move {
        shared_state.notifier.send_message(&reports, kind).await;
    });

    StatusCode::ACCEPTED
}
