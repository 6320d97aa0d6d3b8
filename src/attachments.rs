//! Per-revision attachment blocks.

use serde::Serialize;
use tracing::warn;

use crate::config::SlackConfig;
use crate::filter::allowed_stamps;
use crate::report::{Build, PropertyValue, SourceStamp};
use crate::responsible::ResponsibleUsers;

/// Attachment parts rendered with markdown by the chat platform.
pub const MRKDWN_IN: [&str; 3] = ["text", "title", "fallback"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub title: String,
    pub title_link: String,
    pub fallback: String,
    pub text: String,
    pub color: String,
    pub mrkdwn_in: [&'static str; 3],
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub title: String,
    pub value: PropertyValue,
    pub short: bool,
}

impl Field {
    pub fn new(title: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: true,
        }
    }
}

/// Resolve the committers shown on the attachments of `build`.
///
/// Sub-builds never show fields, so no lookup happens for them. A failing
/// lookup is logged and treated as "no committers".
pub async fn resolve_committers(
    config: &SlackConfig,
    build: &Build,
    lookup: &dyn ResponsibleUsers,
) -> Vec<String> {
    if !config.with_responsible_user || build.is_sub_build() {
        return Vec::new();
    }
    match lookup.responsible_users(build.buildid).await {
        Ok(users) => users,
        Err(e) => {
            warn!(build_id = build.buildid, "Failed to resolve responsible users: {}", e);
            Vec::new()
        }
    }
}

/// One attachment per source stamp passing the codebase filter, built lazily.
pub fn build_attachments<'a>(
    config: &'a SlackConfig,
    build: &'a Build,
    committers: &'a [String],
) -> impl Iterator<Item = Attachment> + 'a {
    allowed_stamps(config, build).map(move |stamp| attachment_for(config, build, stamp, committers))
}

/// Resolve committers, then collect every attachment of `build`.
pub async fn collect_attachments(
    config: &SlackConfig,
    build: &Build,
    lookup: &dyn ResponsibleUsers,
) -> Vec<Attachment> {
    if allowed_stamps(config, build).next().is_none() {
        return Vec::new();
    }
    let committers = resolve_committers(config, build, lookup).await;
    build_attachments(config, build, &committers).collect()
}

fn attachment_title(build: &Build, stamp: &SourceStamp) -> String {
    let mut title = format!("Build #{}", build.buildid);
    if let Some(project) = stamp.project.as_deref().filter(|p| !p.is_empty()) {
        title.push_str(" for ");
        title.push_str(project);
        // A stamp without a revision shows the project alone.
        if let Some(revision) = &stamp.revision {
            title.push(' ');
            title.push_str(revision);
        }
    }
    if let Some((parent_id, relationship)) = build.parent() {
        title.push_str(&format!(" {}: #{}", relationship, parent_id));
    }
    title
}

fn attachment_fields(
    config: &SlackConfig,
    build: &Build,
    stamp: &SourceStamp,
    committers: &[String],
) -> Vec<Field> {
    // The parent build's notification already carries the details.
    if build.is_sub_build() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    if config.with_branch {
        if let Some(branch) = stamp.branch.as_deref().filter(|b| !b.is_empty()) {
            fields.push(Field::new("Branch", branch));
        }
    }
    if config.with_repository {
        if let Some(repository) = stamp.repository.as_deref().filter(|r| !r.is_empty()) {
            fields.push(Field::new("Repository", repository));
        }
    }
    if config.with_responsible_user && !committers.is_empty() {
        fields.push(Field::new("Committers", committers.join(", ")));
    }
    if config.with_builder && !build.builder.name.is_empty() {
        fields.push(Field::new("Builder", build.builder.name.as_str()));
    }
    if let Some(extra_properties) = &config.extra_properties {
        for name in extra_properties {
            if let Some(value) = build.properties.get(name) {
                fields.push(Field::new(name.as_str(), value.to_field_value()));
            }
        }
    }
    fields
}

fn attachment_for(
    config: &SlackConfig,
    build: &Build,
    stamp: &SourceStamp,
    committers: &[String],
) -> Attachment {
    let title = attachment_title(build, stamp);
    Attachment {
        fallback: format!("{}: <{}>", title, build.url),
        title_link: build.url.clone(),
        text: format!("Status: *{}*", build.results.as_str()),
        color: build.results.color().to_string(),
        mrkdwn_in: MRKDWN_IN,
        fields: attachment_fields(config, build, stamp, committers),
        title,
    }
}
