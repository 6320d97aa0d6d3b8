//! HTTP surface for the orchestrator: build events in, diagnostics out.

pub mod events;
pub mod status;

use axum::{Router, routing};

use crate::SharedState;

pub use events::handle_event;
pub use status::{get_logs, root, status};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/status", routing::get(status))
        .route("/logs", routing::get(get_logs))
        .route("/events/{kind}", routing::post(handle_event))
        .with_state(state)
}
