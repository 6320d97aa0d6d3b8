pub mod api;
pub mod attachments;
pub mod config;
pub mod delivery;
pub mod error;
pub mod filter;
pub mod logging;
pub mod message;
pub mod payload;
pub mod report;
pub mod reporter;
pub mod responsible;
pub mod utils;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

pub use config::{NotifyConfig, SlackConfig};
pub use delivery::DeliveryOutcome;
pub use message::EventKind;
pub use report::BuildReport;
pub use reporter::StatusPush;

use logging::LogBuffer;

pub struct AppState {
    pub notifier: StatusPush,
    pub config: NotifyConfig,
    pub log_buffer: LogBuffer,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(notifier: StatusPush, config: NotifyConfig, log_buffer: LogBuffer) -> Self {
        Self {
            notifier,
            config,
            log_buffer,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
