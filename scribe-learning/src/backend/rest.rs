//! REST backend speaking a PostgREST-style table API.
//!
//! Tables: `learned_patterns`, `user_preferences`, `learning_sessions`, each
//! with a `user_id` column. Writes are upserts so replaying a queued write is
//! safe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendResult, LearningBackend};
use crate::error::{BackendError, LearningError};
use crate::types::{LearnedPattern, LearningSession, UserPreference};

const PATTERNS_TABLE: &str = "learned_patterns";
const PREFERENCES_TABLE: &str = "user_preferences";
const SESSIONS_TABLE: &str = "learning_sessions";

/// Connection settings for [`RestBackend`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestBackendConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl RestBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: default_timeout(),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`LearningBackend`] over HTTP
pub struct RestBackend {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(config: RestBackendConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LearningError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            client,
        })
    }

    /// Get the base URL for this backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    fn user_filter(user_id: &str) -> [(&'static str, String); 1] {
        [("user_id", format!("eq.{user_id}"))]
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        check_status(response).await
    }

    async fn fetch_rows<T: DeserializeOwned + Send>(
        &self,
        table: &str,
        user_id: &str,
    ) -> BackendResult<Vec<T>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&Self::user_filter(user_id));
        let response = self.send(request).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn upsert_row<T: Serialize + Sync>(
        &self,
        table: &str,
        row: &T,
        on_conflict: Option<&str>,
        resolution: &str,
    ) -> BackendResult<()> {
        let mut request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", format!("resolution={resolution}"))
            .json(&[row]);
        if let Some(columns) = on_conflict {
            request = request.query(&[("on_conflict", columns)]);
        }
        self.send(request).await?;
        Ok(())
    }

    async fn delete_rows(&self, table: &str, user_id: &str) -> BackendResult<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&Self::user_filter(user_id));
        self.send(request).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BackendError::Unauthenticated);
    }
    let message = response.text().await.unwrap_or_default();
    if status.is_server_error() && status != StatusCode::INTERNAL_SERVER_ERROR {
        // Gateways and maintenance pages
        return Err(BackendError::Unavailable(format!("{status}: {message}")));
    }
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Total from a `Content-Range: 0-24/137` header
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl LearningBackend for RestBackend {
    async fn fetch_patterns(&self, user_id: &str) -> BackendResult<Vec<LearnedPattern>> {
        let rows: Vec<LearnedPattern> = self.fetch_rows(PATTERNS_TABLE, user_id).await?;
        debug!(count = rows.len(), "fetched patterns");
        Ok(rows)
    }

    async fn save_pattern(&self, pattern: &LearnedPattern) -> BackendResult<()> {
        self.upsert_row(PATTERNS_TABLE, pattern, None, "merge-duplicates")
            .await
    }

    async fn fetch_preferences(&self, user_id: &str) -> BackendResult<Vec<UserPreference>> {
        self.fetch_rows(PREFERENCES_TABLE, user_id).await
    }

    async fn save_preference(&self, preference: &UserPreference) -> BackendResult<()> {
        self.upsert_row(
            PREFERENCES_TABLE,
            preference,
            Some("user_id,type"),
            "merge-duplicates",
        )
        .await
    }

    async fn insert_session(&self, session: &LearningSession) -> BackendResult<()> {
        self.upsert_row(SESSIONS_TABLE, session, None, "ignore-duplicates")
            .await
    }

    async fn count_sessions(&self, user_id: &str) -> BackendResult<u64> {
        let request = self
            .client
            .get(self.table_url(SESSIONS_TABLE))
            .query(&Self::user_filter(user_id))
            .query(&[("select", "id")])
            .header("Prefer", "count=exact");
        let response = self.send(request).await?;

        let total = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        match total {
            Some(total) => Ok(total),
            None => {
                let rows: Vec<serde_json::Value> = response
                    .json()
                    .await
                    .map_err(|e| BackendError::Decode(e.to_string()))?;
                Ok(rows.len() as u64)
            }
        }
    }

    async fn delete_all_for_user(&self, user_id: &str) -> BackendResult<()> {
        for table in [PATTERNS_TABLE, PREFERENCES_TABLE, SESSIONS_TABLE] {
            self.delete_rows(table, user_id).await?;
        }
        Ok(())
    }
}
