//! Build reports as delivered by the orchestrator's reporter subscription.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

/// One report produced for a build lifecycle event.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildReport {
    /// Rendered message body from the orchestrator's formatter.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub builds: Vec<Build>,
}

impl BuildReport {
    /// The build this report is about. Only the first build is ever used;
    /// any additional builds in the same report are ignored.
    pub fn primary_build(&self) -> Option<&Build> {
        self.builds.first()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    pub buildid: i64,
    pub builder: Builder,
    #[serde(default)]
    pub results: BuildStatus,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub buildset: Buildset,
}

impl Build {
    /// Parent build id and relationship label when this build was triggered
    /// by another one. A parent id of 0 means "no parent".
    pub fn parent(&self) -> Option<(i64, &str)> {
        match self.buildset.parent_buildid {
            Some(id) if id != 0 => Some((
                id,
                self.buildset
                    .parent_relationship
                    .as_deref()
                    .filter(|r| !r.is_empty())
                    .unwrap_or("parent"),
            )),
            _ => None,
        }
    }

    pub fn is_sub_build(&self) -> bool {
        self.parent().is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Builder {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Buildset {
    #[serde(default)]
    pub sourcestamps: Vec<SourceStamp>,
    #[serde(default)]
    pub parent_buildid: Option<i64>,
    #[serde(default)]
    pub parent_relationship: Option<String>,
}

/// One revision of one codebase consumed by a build.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceStamp {
    /// Absent for builds that were not started from a VCS revision.
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub codebase: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

/// Build result. Numeric codes follow the orchestrator's result constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<RawResult>")]
pub enum BuildStatus {
    Success,
    Warnings,
    Failure,
    Skipped,
    Exception,
    Retry,
    Cancelled,
    /// No result yet, e.g. on build start.
    #[default]
    NotFinished,
    Invalid,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawResult {
    Code(i64),
    Name(String),
}

impl From<Option<RawResult>> for BuildStatus {
    fn from(raw: Option<RawResult>) -> Self {
        match raw {
            None => BuildStatus::NotFinished,
            Some(RawResult::Code(code)) => BuildStatus::from_code(code),
            Some(RawResult::Name(name)) => BuildStatus::from_name(&name),
        }
    }
}

impl BuildStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => BuildStatus::Success,
            1 => BuildStatus::Warnings,
            2 => BuildStatus::Failure,
            3 => BuildStatus::Skipped,
            4 => BuildStatus::Exception,
            5 => BuildStatus::Retry,
            6 => BuildStatus::Cancelled,
            _ => BuildStatus::Invalid,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "success" => BuildStatus::Success,
            "warnings" => BuildStatus::Warnings,
            "failure" => BuildStatus::Failure,
            "skipped" => BuildStatus::Skipped,
            "exception" => BuildStatus::Exception,
            "retry" => BuildStatus::Retry,
            "cancelled" => BuildStatus::Cancelled,
            "not finished" => BuildStatus::NotFinished,
            _ => BuildStatus::Invalid,
        }
    }

    /// Human readable status string, as shown in the attachment status line.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Success => "success",
            BuildStatus::Warnings => "warnings",
            BuildStatus::Failure => "failure",
            BuildStatus::Skipped => "skipped",
            BuildStatus::Exception => "exception",
            BuildStatus::Retry => "retry",
            BuildStatus::Cancelled => "cancelled",
            BuildStatus::NotFinished => "not finished",
            BuildStatus::Invalid => "Invalid status",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            BuildStatus::Success => ":white_check_mark:",
            BuildStatus::Warnings => ":meow_wow:",
            BuildStatus::Failure => ":x:",
            BuildStatus::Skipped => ":hand:",
            BuildStatus::Exception => ":skull:",
            BuildStatus::Retry => ":face_palm:",
            BuildStatus::Cancelled => ":hand:",
            _ => ":hourglass_flowing_sand:",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            BuildStatus::Success => "#36a64f",
            BuildStatus::Failure | BuildStatus::Exception => "#fc0303",
            BuildStatus::Warnings
            | BuildStatus::Skipped
            | BuildStatus::Retry
            | BuildStatus::Cancelled => "#fc8c03",
            _ => "",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single build property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Lists and maps, e.g. `got_revision` keyed by codebase.
    Other(serde_json::Value),
}

impl PropertyValue {
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Null => true,
            PropertyValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// The value as an attachment field shows it: lists and maps become
    /// their JSON text, everything else is kept as is.
    pub fn to_field_value(&self) -> PropertyValue {
        match self {
            PropertyValue::Other(value) => PropertyValue::String(value.to_string()),
            other => other.clone(),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Number(n.into())
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Other(value) => write!(f, "{}", value),
        }
    }
}

// Properties arrive either as bare values or as `[value, source]` pairs.
#[derive(Deserialize)]
#[serde(untagged)]
enum PropertyEntry {
    Sourced(PropertyValue, String),
    Bare(PropertyValue),
}

/// Build property bag, keyed by property name. A `null` bag is empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Option<HashMap<String, PropertyEntry>>")]
pub struct Properties(HashMap<String, PropertyValue>);

impl From<Option<HashMap<String, PropertyEntry>>> for Properties {
    fn from(raw: Option<HashMap<String, PropertyEntry>>) -> Self {
        Properties(
            raw.unwrap_or_default()
                .into_iter()
                .map(|(name, entry)| {
                    let value = match entry {
                        PropertyEntry::Sourced(value, _) | PropertyEntry::Bare(value) => value,
                    };
                    (name, value)
                })
                .collect(),
        )
    }
}

impl Properties {
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Properties(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReportsBody {
    Many(Vec<BuildReport>),
    One(BuildReport),
}

/// Parse an event body holding either a single report or a list of them.
pub fn parse_reports(body: &[u8]) -> Result<Vec<BuildReport>> {
    let reports = match serde_json::from_slice::<ReportsBody>(body)? {
        ReportsBody::Many(reports) => reports,
        ReportsBody::One(report) => vec![report],
    };
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build_json(results: serde_json::Value) -> serde_json::Value {
        json!({
            "buildid": 42,
            "builder": {"name": "linux"},
            "results": results,
            "url": "http://ci/builds/42",
            "properties": {
                "owner": ["alice", "Force Build Form"],
                "attempt": 3,
                "nightly": [true, "Scheduler"]
            },
            "buildset": {
                "sourcestamps": [{"revision": "abc123", "codebase": "", "project": "demo"}]
            }
        })
    }

    #[test]
    fn test_status_from_codes() {
        let expected = [
            BuildStatus::Success,
            BuildStatus::Warnings,
            BuildStatus::Failure,
            BuildStatus::Skipped,
            BuildStatus::Exception,
            BuildStatus::Retry,
            BuildStatus::Cancelled,
        ];
        for (code, status) in expected.iter().enumerate() {
            assert_eq!(BuildStatus::from_code(code as i64), *status);
        }
        assert_eq!(BuildStatus::from_code(7), BuildStatus::Invalid);
        assert_eq!(BuildStatus::from_code(-1), BuildStatus::Invalid);
    }

    #[test]
    fn test_emoji_and_color_tables() {
        let table = [
            (BuildStatus::Success, ":white_check_mark:", "#36a64f"),
            (BuildStatus::Warnings, ":meow_wow:", "#fc8c03"),
            (BuildStatus::Failure, ":x:", "#fc0303"),
            (BuildStatus::Skipped, ":hand:", "#fc8c03"),
            (BuildStatus::Exception, ":skull:", "#fc0303"),
            (BuildStatus::Retry, ":face_palm:", "#fc8c03"),
            (BuildStatus::Cancelled, ":hand:", "#fc8c03"),
        ];
        for (status, emoji, color) in table {
            assert_eq!(status.emoji(), emoji, "{}", status);
            assert_eq!(status.color(), color, "{}", status);
        }
        for status in [BuildStatus::NotFinished, BuildStatus::Invalid] {
            assert_eq!(status.emoji(), ":hourglass_flowing_sand:");
            assert_eq!(status.color(), "");
        }
    }

    #[test]
    fn test_deserialize_results_variants() {
        let build: Build = serde_json::from_value(build_json(json!(2))).unwrap();
        assert_eq!(build.results, BuildStatus::Failure);

        let build: Build = serde_json::from_value(build_json(json!("success"))).unwrap();
        assert_eq!(build.results, BuildStatus::Success);

        let build: Build = serde_json::from_value(build_json(json!(null))).unwrap();
        assert_eq!(build.results, BuildStatus::NotFinished);

        let mut raw = build_json(json!(0));
        raw.as_object_mut().unwrap().remove("results");
        let build: Build = serde_json::from_value(raw).unwrap();
        assert_eq!(build.results, BuildStatus::NotFinished);
    }

    #[test]
    fn test_properties_accept_sourced_and_bare_values() {
        let build: Build = serde_json::from_value(build_json(json!(0))).unwrap();
        assert_eq!(build.properties.len(), 3);
        assert_eq!(build.properties.get("owner"), Some(&PropertyValue::from("alice")));
        assert_eq!(build.properties.get("attempt"), Some(&PropertyValue::from(3i64)));
        assert_eq!(build.properties.get("nightly"), Some(&PropertyValue::Bool(true)));
        assert_eq!(build.properties.get("missing"), None);
    }

    #[test]
    fn test_structured_and_null_properties() {
        let mut raw = build_json(json!(0));
        raw["properties"] = json!({
            "got_revision": [{"app": "abc", "lib": "def"}, "Git"],
            "builders": [["a", "b", "c"], "Scheduler"],
            "owner": ["alice", "Force Build Form"]
        });
        let build: Build = serde_json::from_value(raw.clone()).unwrap();

        let got_revision = build.properties.get("got_revision").unwrap();
        assert_eq!(
            got_revision,
            &PropertyValue::Other(json!({"app": "abc", "lib": "def"}))
        );
        assert_eq!(
            got_revision.to_field_value(),
            PropertyValue::from(r#"{"app":"abc","lib":"def"}"#)
        );
        assert_eq!(
            build.properties.get("builders"),
            Some(&PropertyValue::Other(json!(["a", "b", "c"])))
        );
        assert_eq!(build.properties.get("owner"), Some(&PropertyValue::from("alice")));

        raw["properties"] = json!(null);
        let build: Build = serde_json::from_value(raw).unwrap();
        assert!(build.properties.is_empty());
    }

    #[test]
    fn test_report_with_structured_property_parses() {
        let mut build = build_json(json!(0));
        build["properties"]["got_revision"] = json!([{"app": "abc", "lib": "def"}, "Git"]);
        let body = json!({"body": "Build done.", "builds": [build]});

        let reports = parse_reports(body.to_string().as_bytes()).unwrap();
        assert_eq!(reports[0].primary_build().map(|b| b.properties.len()), Some(4));
    }

    #[test]
    fn test_parent_linkage() {
        let mut build: Build = serde_json::from_value(build_json(json!(0))).unwrap();
        assert!(!build.is_sub_build());

        build.buildset.parent_buildid = Some(0);
        assert!(!build.is_sub_build());

        build.buildset.parent_buildid = Some(7);
        build.buildset.parent_relationship = Some("triggered from".to_string());
        assert_eq!(build.parent(), Some((7, "triggered from")));

        build.buildset.parent_relationship = None;
        assert_eq!(build.parent(), Some((7, "parent")));
    }

    #[test]
    fn test_parse_reports_single_and_many() {
        let one = json!({"body": "Build done.", "builds": [build_json(json!(0))]});
        let reports = parse_reports(one.to_string().as_bytes()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].primary_build().map(|b| b.buildid), Some(42));

        let many = json!([one.clone(), one]);
        assert_eq!(parse_reports(many.to_string().as_bytes()).unwrap().len(), 2);

        assert!(parse_reports(b"not json").is_err());
    }
}
