//! Lookup of the users responsible for a build.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{NotifyError, Result};

#[async_trait]
pub trait ResponsibleUsers: Send + Sync {
    /// Identifiers of the committers behind `build_id`, in display order.
    async fn responsible_users(&self, build_id: i64) -> Result<Vec<String>>;
}

/// Used when no lookup is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResponsibleUsers;

#[async_trait]
impl ResponsibleUsers for NoResponsibleUsers {
    async fn responsible_users(&self, _build_id: i64) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Fixed build id to users mapping, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResponsibleUsers {
    users: HashMap<i64, Vec<String>>,
}

impl StaticResponsibleUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I, S>(mut self, build_id: i64, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users
            .insert(build_id, users.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl ResponsibleUsers for StaticResponsibleUsers {
    async fn responsible_users(&self, build_id: i64) -> Result<Vec<String>> {
        Ok(self.users.get(&build_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct ChangesResponse {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    author: Option<String>,
}

/// Resolves committers through the orchestrator REST API
/// (`GET {api_url}/builds/{id}/changes`).
#[derive(Debug, Clone)]
pub struct ApiResponsibleUsers {
    client: reqwest::Client,
    api_url: String,
}

impl ApiResponsibleUsers {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn changes_url(&self, build_id: i64) -> String {
        format!("{}/builds/{}/changes", self.api_url, build_id)
    }
}

#[async_trait]
impl ResponsibleUsers for ApiResponsibleUsers {
    async fn responsible_users(&self, build_id: i64) -> Result<Vec<String>> {
        let url = self.changes_url(build_id);
        debug!("Looking up responsible users at {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Lookup {
                build_id,
                message: format!("{} returned {}", url, response.status()),
            });
        }

        let body: ChangesResponse = response.json().await?;
        Ok(distinct_authors(body.changes))
    }
}

fn distinct_authors(changes: Vec<Change>) -> Vec<String> {
    let mut authors: Vec<String> = Vec::new();
    for author in changes.into_iter().filter_map(|c| c.author) {
        if !author.is_empty() && !authors.contains(&author) {
            authors.push(author);
        }
    }
    authors
}
