use super::types::{RawBackendConfig, RawLearningConfig, RawScribeConfig, ScribeConfig};
use anyhow::{Context, Result};
use scribe_learning::LearningConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<ScribeConfig> {
        Self::load_layers(Some(&Self::user_config_path()), &Self::project_config_path())
    }

    /// Load a single config file, falling back to defaults when it is missing
    pub fn load_from_path(path: &Path) -> Result<ScribeConfig> {
        let raw = Self::read_raw(path)?.unwrap_or_default();
        Ok(Self::finalize(raw))
    }

    /// Load a user layer and a project layer; the project layer wins
    pub fn load_layers(user_path: Option<&Path>, project_path: &Path) -> Result<ScribeConfig> {
        let mut raw = RawScribeConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && let Some(user_config) = Self::read_raw(user_path)?
        {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(project_path)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        scribe_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with SCRIBE_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("SCRIBE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".scribe/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawScribeConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "reading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawScribeConfig, overlay: RawScribeConfig) -> RawScribeConfig {
        let (base, overlay) = (base.learning, overlay.learning);
        RawScribeConfig {
            learning: RawLearningConfig {
                enabled: overlay.enabled.or(base.enabled),
                user_id: overlay.user_id.or(base.user_id),
                device_id: overlay.device_id.or(base.device_id),
                data_dir: overlay.data_dir.or(base.data_dir),
                replay_interval: overlay.replay_interval.or(base.replay_interval),
                max_attempts: overlay.max_attempts.or(base.max_attempts),
                max_queue_len: overlay.max_queue_len.or(base.max_queue_len),
                edit_review_probability: overlay
                    .edit_review_probability
                    .or(base.edit_review_probability),
                backend: RawBackendConfig {
                    url: overlay.backend.url.or(base.backend.url),
                    api_key: overlay.backend.api_key.or(base.backend.api_key),
                    timeout: overlay.backend.timeout.or(base.backend.timeout),
                },
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawScribeConfig) -> ScribeConfig {
        let raw = raw.learning;
        let defaults = LearningConfig::default();
        let mut learning = LearningConfig {
            enabled: raw.enabled.unwrap_or(defaults.enabled),
            user_id: raw.user_id,
            device_id: raw.device_id,
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            replay_interval: raw.replay_interval.unwrap_or(defaults.replay_interval),
            max_attempts: raw.max_attempts.unwrap_or(defaults.max_attempts),
            max_queue_len: raw.max_queue_len.unwrap_or(defaults.max_queue_len),
            edit_review_probability: raw
                .edit_review_probability
                .unwrap_or(defaults.edit_review_probability),
            backend: defaults.backend,
        };
        learning.backend.url = raw.backend.url;
        learning.backend.api_key = raw.backend.api_key;
        if let Some(timeout) = raw.backend.timeout {
            learning.backend.timeout = timeout;
        }
        ScribeConfig { learning }
    }
}
