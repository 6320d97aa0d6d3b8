//! The notification pipeline: filter, format, build attachments, assemble,
//! deliver.

use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::attachments::collect_attachments;
use crate::config::{NotifyConfig, SlackConfig};
use crate::delivery::{DeliveryClient, DeliveryOutcome};
use crate::error::Result;
use crate::filter::{allowed_stamps, builder_allowed};
use crate::message::{EventKind, format_message, message_body};
use crate::payload::{ExtraParams, NoExtraParams, NotificationPayload, assemble_payload};
use crate::report::{Build, BuildReport};
use crate::responsible::{ApiResponsibleUsers, NoResponsibleUsers, ResponsibleUsers};

/// Pushes build status notifications to a chat incoming webhook.
///
/// Holds only read-only configuration and collaborators, so one instance can
/// serve concurrent events.
pub struct StatusPush {
    config: Arc<SlackConfig>,
    delivery: DeliveryClient,
    responsible_users: Arc<dyn ResponsibleUsers>,
    extra_params: Arc<dyn ExtraParams>,
}

impl StatusPush {
    pub fn new(config: Arc<SlackConfig>, delivery: DeliveryClient) -> Self {
        Self {
            config,
            delivery,
            responsible_users: Arc::new(NoResponsibleUsers),
            extra_params: Arc::new(NoExtraParams),
        }
    }

    /// Wire up delivery and, when configured, the REST committer lookup.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let delivery = DeliveryClient::from_config(&config.slack)?;
        let mut notifier = Self::new(Arc::new(config.slack.clone()), delivery);
        if let Some(api_url) = &config.responsible_users.api_url {
            let lookup = ApiResponsibleUsers::new(notifier.delivery.http_client().clone(), api_url);
            notifier = notifier.with_responsible_users(Arc::new(lookup));
        }
        Ok(notifier)
    }

    pub fn with_responsible_users(mut self, lookup: Arc<dyn ResponsibleUsers>) -> Self {
        self.responsible_users = lookup;
        self
    }

    pub fn with_extra_params(mut self, extra_params: Arc<dyn ExtraParams>) -> Self {
        self.extra_params = extra_params;
        self
    }

    pub fn config(&self) -> &SlackConfig {
        &self.config
    }

    pub async fn build_started(&self, reports: &[BuildReport]) -> Option<DeliveryOutcome> {
        self.send_message(reports, EventKind::BuildStarted).await
    }

    pub async fn build_finished(&self, reports: &[BuildReport]) -> Option<DeliveryOutcome> {
        self.send_message(reports, EventKind::BuildFinished).await
    }

    /// Assemble the payload for `build`, the primary build of `report`.
    pub async fn build_payload(
        &self,
        report: &BuildReport,
        build: &Build,
        kind: EventKind,
    ) -> NotificationPayload {
        let config = self.config.as_ref();
        let text = format_message(config, build, message_body(config, report, kind));

        let attachments = if config.attachments {
            collect_attachments(config, build, self.responsible_users.as_ref()).await
        } else {
            Vec::new()
        };

        let extra = self.extra_params.extra_params(build);
        assemble_payload(config, text, attachments, extra)
    }

    /// Run the pipeline for one event.
    ///
    /// Only the first report, and only its first build, are considered; any
    /// further reports or builds are ignored. Returns `None` when nothing was
    /// sent. Delivery failures are logged and reported through the outcome,
    /// never raised.
    pub async fn send_message(
        &self,
        reports: &[BuildReport],
        kind: EventKind,
    ) -> Option<DeliveryOutcome> {
        let report = reports.first()?;
        let Some(build) = report.primary_build() else {
            debug!("Report without builds for {} event, skipping.", kind);
            return None;
        };

        let span = info_span!(
            "notification",
            id = %Uuid::now_v7(),
            event = %kind,
            build_id = build.buildid
        );
        self.notify(report, build, kind).instrument(span).await
    }

    async fn notify(
        &self,
        report: &BuildReport,
        build: &Build,
        kind: EventKind,
    ) -> Option<DeliveryOutcome> {
        let config = self.config.as_ref();
        if !builder_allowed(config, build) {
            debug!("Builder '{}' is not in the allow-list, skipping.", build.builder.name);
            return None;
        }

        let payload = self.build_payload(report, build, kind).await;
        if payload.is_empty() {
            return None;
        }

        let outcome = self.delivery.deliver(&payload).await;
        self.log_outcome(build, &outcome);
        Some(outcome)
    }

    fn log_outcome(&self, build: &Build, outcome: &DeliveryOutcome) {
        let mut stamps = allowed_stamps(&self.config, build).peekable();
        if stamps.peek().is_none() {
            if let DeliveryOutcome::TransportFailed { error } = outcome {
                error!("Failed to send status for build {}: {}", build.buildid, error);
            }
            return;
        }

        for stamp in stamps {
            let repository = stamp.repository.as_deref().unwrap_or("(unknown repository)");
            let revision = match stamp.revision.as_deref() {
                Some(revision) => revision,
                None => {
                    info!("no special revision for this");
                    "(no revision)"
                }
            };
            match outcome {
                DeliveryOutcome::Delivered => {
                    debug!("Status delivered for {} at {}", repository, revision)
                }
                DeliveryOutcome::RemoteRejected { status, .. } => {
                    debug!("Status rejected ({}) for {} at {}", status, repository, revision)
                }
                DeliveryOutcome::TransportFailed { error } => {
                    error!(
                        "Failed to send status for {} at {}: {}",
                        repository, revision, error
                    )
                }
            }
        }
    }
}
