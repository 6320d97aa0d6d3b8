//! Notifier configuration.
//!
//! Options are validated loosely: a value of the wrong type is reported as a
//! [`ConfigWarning`] and the option falls back to its default. Only a missing
//! file, broken TOML or a missing endpoint stop startup.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

use crate::error::{NotifyError, Result};

pub const DEFAULT_STARTED_MESSAGE: &str = "Build started.";
pub const DEFAULT_FINISHED_MESSAGE: &str = "Build done.";

const SLACK_OPTIONS: &[&str] = &[
    "endpoint",
    "channel",
    "username",
    "attachments",
    "verbose",
    "debug",
    "verify",
    "timeout_secs",
    "codebases",
    "builder",
    "with_branch",
    "with_builder",
    "with_repository",
    "with_responsible_user",
    "extra_properties",
    "host_url",
    "messages",
];

#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub responsible_users: ResponsibleUsersConfig,
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    /// Shared secret used to sign inbound build events.
    pub event_secret: Option<String>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ResponsibleUsersConfig {
    /// Orchestrator REST API base, e.g. `http://ci.example.com/api/v2`.
    pub api_url: Option<String>,
}

/// Chat webhook options. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub endpoint: String,
    pub channel: Option<String>,
    pub username: Option<String>,
    pub attachments: bool,
    pub verbose: bool,
    pub debug: bool,
    pub verify: bool,
    pub timeout_secs: Option<u64>,
    /// `None` allows every codebase.
    pub codebases: Option<HashSet<String>>,
    /// `None` allows every builder.
    pub builder: Option<HashSet<String>>,
    pub with_branch: bool,
    pub with_builder: bool,
    pub with_repository: bool,
    pub with_responsible_user: bool,
    pub extra_properties: Option<Vec<String>>,
    pub messages: MessagesConfig,
}

impl SlackConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            channel: None,
            username: None,
            attachments: true,
            verbose: false,
            debug: false,
            verify: true,
            timeout_secs: None,
            codebases: None,
            builder: None,
            with_branch: true,
            with_builder: true,
            with_repository: true,
            with_responsible_user: true,
            extra_properties: None,
            messages: MessagesConfig::default(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Fallback message bodies, used when a report arrives without one.
#[derive(Debug, Clone)]
pub struct MessagesConfig {
    pub started: String,
    pub finished: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            started: DEFAULT_STARTED_MESSAGE.to_string(),
            finished: DEFAULT_FINISHED_MESSAGE.to_string(),
        }
    }
}

/// A non-fatal configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub option: String,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.option, self.message)
    }
}

/// Reads typed options out of one TOML section, recording type mismatches.
struct OptionReader<'a> {
    section: &'static str,
    table: Option<&'a Table>,
    warnings: &'a mut Vec<ConfigWarning>,
}

impl<'a> OptionReader<'a> {
    fn new(
        section: &'static str,
        table: Option<&'a Table>,
        warnings: &'a mut Vec<ConfigWarning>,
    ) -> Self {
        Self {
            section,
            table,
            warnings,
        }
    }

    fn warn(&mut self, key: &str, message: String) {
        self.warnings.push(ConfigWarning {
            option: format!("{}.{}", self.section, key),
            message,
        });
    }

    fn wrong_type(&mut self, key: &str, expected: &str, got: &Value) {
        let message = format!("{} must be {}, got '{}' instead", key, expected, got.type_str());
        self.warn(key, message);
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.table.and_then(|t| t.get(key))
    }

    fn string(&mut self, key: &str) -> Option<String> {
        match self.get(key) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.wrong_type(key, "a string", other);
                None
            }
        }
    }

    fn bool(&mut self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(Value::Boolean(b)) => *b,
            Some(other) => {
                self.wrong_type(key, "a boolean", other);
                default
            }
        }
    }

    fn unsigned(&mut self, key: &str) -> Option<u64> {
        match self.get(key) {
            None => None,
            Some(Value::Integer(n)) if *n >= 0 => Some(*n as u64),
            Some(other) => {
                self.wrong_type(key, "a non-negative integer", other);
                None
            }
        }
    }

    /// A list of strings. A single string is accepted as a one-element list.
    fn string_list(&mut self, key: &str) -> Option<Vec<String>> {
        match self.get(key) {
            None => None,
            Some(Value::String(s)) => Some(vec![s.clone()]),
            Some(Value::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => values.push(s.clone()),
                        other => self.wrong_type(key, "a list of strings", other),
                    }
                }
                Some(values)
            }
            Some(other) => {
                self.wrong_type(key, "a list of strings", other);
                None
            }
        }
    }

    fn string_set(&mut self, key: &str) -> Option<HashSet<String>> {
        self.string_list(key).map(|v| v.into_iter().collect())
    }
}

/// Parse configuration from TOML source, returning it with any warnings.
pub fn parse_config(source: &str) -> Result<(NotifyConfig, Vec<ConfigWarning>)> {
    let root: Table = toml::from_str(source)?;
    let mut warnings = Vec::new();

    let slack_table = match root.get("slack") {
        Some(Value::Table(t)) => t,
        _ => {
            return Err(NotifyError::ConfigError(
                "missing [slack] section".to_string(),
            ));
        }
    };

    let slack = parse_slack(slack_table, &mut warnings)?;

    let server = {
        let mut reader = OptionReader::new("server", table(&root, "server"), &mut warnings);
        ServerConfig {
            bind_address: reader.string("bind_address"),
            event_secret: reader.string("event_secret"),
            log_dir: reader.string("log_dir").map(PathBuf::from),
        }
    };

    let responsible_users = {
        let mut reader = OptionReader::new(
            "responsible_users",
            table(&root, "responsible_users"),
            &mut warnings,
        );
        ResponsibleUsersConfig {
            api_url: reader.string("api_url"),
        }
    };

    Ok((
        NotifyConfig {
            server,
            slack,
            responsible_users,
        },
        warnings,
    ))
}

fn table<'a>(root: &'a Table, key: &str) -> Option<&'a Table> {
    root.get(key).and_then(Value::as_table)
}

fn parse_slack(slack: &Table, warnings: &mut Vec<ConfigWarning>) -> Result<SlackConfig> {
    let mut reader = OptionReader::new("slack", Some(slack), warnings);

    let endpoint = match slack.get("endpoint") {
        None => {
            return Err(NotifyError::ConfigError(
                "[slack].endpoint is required".to_string(),
            ));
        }
        Some(Value::String(s)) => {
            if !s.starts_with("http") {
                reader.warn(
                    "endpoint",
                    format!("endpoint should start with \"http...\", endpoint: {}", s),
                );
            }
            s.clone()
        }
        Some(other) => {
            reader.wrong_type("endpoint", "a string", other);
            other.to_string()
        }
    };

    for key in slack.keys() {
        if !SLACK_OPTIONS.contains(&key.as_str()) {
            reader.warn(key, format!("unknown option '{}' is ignored", key));
        }
    }

    if reader.string("host_url").is_some() {
        reader.warn(
            "host_url",
            "argument host_url is deprecated and will be removed: specify the full url as endpoint"
                .to_string(),
        );
    }

    let mut config = SlackConfig::new(endpoint);
    config.channel = reader.string("channel");
    config.username = reader.string("username");
    config.attachments = reader.bool("attachments", true);
    config.verbose = reader.bool("verbose", false);
    config.debug = reader.bool("debug", false);
    config.verify = reader.bool("verify", true);
    config.timeout_secs = reader.unsigned("timeout_secs");
    config.codebases = reader.string_set("codebases");
    config.builder = reader.string_set("builder");
    config.with_branch = reader.bool("with_branch", true);
    config.with_builder = reader.bool("with_builder", true);
    config.with_repository = reader.bool("with_repository", true);
    config.with_responsible_user = reader.bool("with_responsible_user", true);
    config.extra_properties = reader.string_list("extra_properties");

    let messages = match slack.get("messages") {
        None => None,
        Some(Value::Table(t)) => Some(t),
        Some(other) => {
            reader.wrong_type("messages", "a table", other);
            None
        }
    };
    let mut messages_reader = OptionReader::new("slack.messages", messages, warnings);
    if let Some(started) = messages_reader.string("started") {
        config.messages.started = started;
    }
    if let Some(finished) = messages_reader.string("finished") {
        config.messages.finished = finished;
    }

    Ok(config)
}

/// Read and parse the configuration file.
pub fn read_config(path: impl AsRef<Path>) -> Result<(NotifyConfig, Vec<ConfigWarning>)> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| {
        NotifyError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&source)
}
