pub mod apply;
pub mod choose;
pub mod config;
pub mod decide;
pub mod patterns;
pub mod reset;
pub mod review;
pub mod stats;
pub mod sync;

use anyhow::{Context, Result};
use scribe_learning::{LearningEngine, RefinementMode};
use tracing::debug;

use crate::config::ConfigLoader;

/// Open the learning engine from the merged configuration
pub async fn open_engine() -> Result<LearningEngine> {
    let config = ConfigLoader::load()?;
    debug!(
        data_dir = %config.learning.data_dir.display(),
        signed_in = config.learning.user_id.is_some(),
        backend = config.learning.backend.url.as_deref().unwrap_or("none"),
        "opening learning engine"
    );
    LearningEngine::from_config(config.learning)
        .await
        .context("failed to start learning engine")
}

pub fn parse_mode(mode: &str) -> Result<RefinementMode> {
    Ok(mode.parse()?)
}
