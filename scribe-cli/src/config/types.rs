use std::path::PathBuf;
use std::time::Duration;

use scribe_learning::LearningConfig;
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawScribeConfig {
    #[serde(default)]
    pub learning: RawLearningConfig,
}

/// Learning config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLearningConfig {
    pub enabled: Option<bool>,
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub data_dir: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    pub replay_interval: Option<Duration>,
    pub max_attempts: Option<u32>,
    pub max_queue_len: Option<usize>,
    pub edit_review_probability: Option<f64>,
    #[serde(default)]
    pub backend: RawBackendConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBackendConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScribeConfig {
    #[serde(default)]
    pub learning: LearningConfig,
}
