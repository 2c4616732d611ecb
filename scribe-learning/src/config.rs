//! Configuration for the learning engine.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decision::DEFAULT_EDIT_REVIEW_PROBABILITY;
use crate::queue::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_LEN};

/// Connection to the remote learning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the REST backend. Unset means local-only learning.
    #[serde(default)]
    pub url: Option<String>,

    /// API key sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

/// Configuration for [`LearningEngine`](crate::LearningEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Master switch for learning.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Signed-in user. Writes queue until one is set.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Device identifier stamped on sessions. Generated and persisted when unset.
    #[serde(default)]
    pub device_id: Option<String>,

    /// Directory for the offline queue and cache snapshot.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Interval between offline queue replays.
    #[serde(default = "default_replay_interval", with = "humantime_serde")]
    pub replay_interval: Duration,

    /// Attempts before a queued write is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum number of queued writes.
    #[serde(default = "default_max_queue_len")]
    pub max_queue_len: usize,

    /// Chance of an edit review once past the bootstrap phase.
    #[serde(default = "default_edit_review_probability")]
    pub edit_review_probability: f64,

    #[serde(default)]
    pub backend: BackendSettings,
}

fn default_enabled() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    scribe_paths::data_dir().join("learning")
}

fn default_replay_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_max_queue_len() -> usize {
    DEFAULT_MAX_LEN
}

fn default_edit_review_probability() -> f64 {
    DEFAULT_EDIT_REVIEW_PROBABILITY
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            user_id: None,
            device_id: None,
            data_dir: default_data_dir(),
            replay_interval: default_replay_interval(),
            max_attempts: default_max_attempts(),
            max_queue_len: default_max_queue_len(),
            edit_review_probability: default_edit_review_probability(),
            backend: BackendSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: default_timeout(),
        }
    }
}

impl LearningConfig {
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    #[must_use]
    pub fn with_replay_interval(mut self, interval: Duration) -> Self {
        self.replay_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend.url = Some(url.into());
        self
    }

    /// REST backend settings, when a URL is configured.
    pub fn rest_backend(&self) -> Option<crate::backend::RestBackendConfig> {
        let url = self.backend.url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        let mut config = crate::backend::RestBackendConfig::new(url).with_timeout(self.backend.timeout);
        if let Some(key) = &self.backend.api_key {
            config = config.with_api_key(key.clone());
        }
        Some(config)
    }
}
