//! Builder and codebase allow-lists.

use crate::config::SlackConfig;
use crate::report::{Build, SourceStamp};

/// Whether a notification should be produced for this build at all.
pub fn builder_allowed(config: &SlackConfig, build: &Build) -> bool {
    match &config.builder {
        Some(allowed) => allowed.contains(&build.builder.name),
        None => true,
    }
}

/// Whether a single source stamp takes part in the notification.
pub fn codebase_allowed(config: &SlackConfig, stamp: &SourceStamp) -> bool {
    match &config.codebases {
        Some(allowed) => allowed.contains(&stamp.codebase),
        None => true,
    }
}

/// Source stamps of `build` that pass the codebase allow-list, in order.
pub fn allowed_stamps<'a>(
    config: &'a SlackConfig,
    build: &'a Build,
) -> impl Iterator<Item = &'a SourceStamp> + 'a {
    build
        .buildset
        .sourcestamps
        .iter()
        .filter(move |stamp| codebase_allowed(config, stamp))
}
