//! On-disk snapshot of the learned state
//!
//! Lets the engine start with the user's patterns and preferences while the
//! backend is unreachable, and is the only store in local-only mode. Safe to
//! delete; a corrupt snapshot is discarded.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{LearnedPattern, UserPreference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub user_id: Option<String>,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub session_count: u64,
    #[serde(default)]
    pub patterns: Vec<LearnedPattern>,
    #[serde(default)]
    pub preferences: Vec<UserPreference>,
}

impl Snapshot {
    pub fn new(
        user_id: Option<String>,
        session_count: u64,
        patterns: Vec<LearnedPattern>,
        preferences: Vec<UserPreference>,
    ) -> Self {
        Self {
            user_id,
            saved_at: Utc::now(),
            session_count,
            patterns,
            preferences,
        }
    }
}

/// Load the snapshot at `path` if it belongs to `user_id`
pub async fn load(path: &Path, user_id: Option<&str>) -> Option<Snapshot> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read learning cache");
            return None;
        }
    };

    let snapshot: Snapshot = match serde_json::from_slice(&contents) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding corrupt learning cache");
            return None;
        }
    };

    if snapshot.user_id.as_deref() != user_id {
        debug!("learning cache belongs to another user, ignoring");
        return None;
    }
    Some(snapshot)
}

/// Write the snapshot atomically.
///
/// Each call stages into its own temp file, so concurrent writers never move
/// each other's data.
pub async fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, json).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Remove the snapshot; a missing file is fine
pub async fn remove(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PhraseChange, PreferenceType, RefinementMode};
    use tempfile::TempDir;

    fn snapshot(user: Option<&str>) -> Snapshot {
        Snapshot::new(
            user.map(String::from),
            12,
            vec![LearnedPattern::new(
                user.map(String::from),
                &PhraseChange::new("gonna", "going to"),
                RefinementMode::Email,
            )],
            vec![UserPreference::new(
                user.map(String::from),
                PreferenceType::Formality,
            )],
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let original = snapshot(Some("alex"));

        save(&path, &original).await.unwrap();
        let loaded = load(&path, Some("alex")).await.unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_other_user_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        save(&path, &snapshot(Some("alex"))).await.unwrap();

        assert!(load(&path, Some("sam")).await.is_none());
        assert!(load(&path, None).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_or_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        assert!(load(&path, None).await.is_none());

        std::fs::write(&path, "[1, 2").unwrap();
        assert!(load(&path, None).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_all_succeed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut handles = Vec::new();
        for count in 0..16 {
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                let mut snapshot = snapshot(Some("alex"));
                snapshot.session_count = count;
                save(&path, &snapshot).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(load(&path, Some("alex")).await.is_some());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        save(&path, &snapshot(None)).await.unwrap();

        remove(&path).await.unwrap();
        remove(&path).await.unwrap();
        assert!(!path.exists());
    }
}
