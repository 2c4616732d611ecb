//! File layout of the learning engine's local state

use std::path::PathBuf;

use tracing::warn;
use uuid::Uuid;

/// Local files owned by the engine
#[derive(Debug, Clone)]
pub struct EnginePaths {
    /// Base directory (e.g., ~/.local/share/scribe/learning on Linux)
    pub data_dir: PathBuf,
    /// Durable offline write queue
    pub queue_file: PathBuf,
    /// Disposable pattern/preference snapshot
    pub cache_file: PathBuf,
    /// Generated device identifier
    pub device_id_file: PathBuf,
}

impl EnginePaths {
    pub fn from_base(data_dir: PathBuf) -> Self {
        Self {
            queue_file: data_dir.join("offline_queue.json"),
            cache_file: data_dir.join("cache.json"),
            device_id_file: data_dir.join("device_id"),
            data_dir,
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    /// Read the persisted device id, generating and storing one if missing
    pub fn device_id(&self) -> String {
        if let Ok(existing) = std::fs::read_to_string(&self.device_id_file) {
            let existing = existing.trim();
            if !existing.is_empty() {
                return existing.to_string();
            }
        }

        let generated = Uuid::new_v4().to_string();
        if let Err(e) = self
            .ensure_dirs()
            .and_then(|()| std::fs::write(&self.device_id_file, &generated))
        {
            warn!(error = %e, "failed to persist device id");
        }
        generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_base_creates_correct_paths() {
        let base = PathBuf::from("/tmp/test-learning");
        let paths = EnginePaths::from_base(base.clone());

        assert_eq!(paths.data_dir, base);
        assert_eq!(paths.queue_file, base.join("offline_queue.json"));
        assert_eq!(paths.cache_file, base.join("cache.json"));
        assert_eq!(paths.device_id_file, base.join("device_id"));
    }

    #[test]
    fn test_device_id_is_stable() {
        let dir = TempDir::new().unwrap();
        let paths = EnginePaths::from_base(dir.path().join("learning"));

        let first = paths.device_id();
        let second = paths.device_id();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }
}
