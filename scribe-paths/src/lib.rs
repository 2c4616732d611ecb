//! XDG Base Directory paths for scribe.
//!
//! Config and learning data follow XDG on every platform so the CLI and
//! embedding apps agree on where the offline queue and caches live.

use std::path::PathBuf;

const APP_DIR: &str = "scribe";

/// Get the scribe config directory.
///
/// Returns `$XDG_CONFIG_HOME/scribe` if set, otherwise `~/.config/scribe`.
///
/// # Examples
///
/// ```
/// use scribe_paths::config_dir;
///
/// let config = config_dir();
/// let file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var("XDG_CONFIG_HOME").ok(),
        dirs::home_dir(),
        ".config",
    )
}

/// Get the scribe data directory.
///
/// Returns `$XDG_DATA_HOME/scribe` if set, otherwise `~/.local/share/scribe`.
/// The offline write queue and the learning cache snapshot live under here.
///
/// # Examples
///
/// ```
/// use scribe_paths::data_dir;
///
/// let data = data_dir();
/// let learning = data.join("learning");
/// ```
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var("XDG_DATA_HOME").ok(),
        dirs::home_dir(),
        ".local/share",
    )
}

fn resolve(xdg: Option<String>, home: Option<PathBuf>, fallback: &str) -> PathBuf {
    match (xdg.filter(|v| !v.is_empty()), home) {
        (Some(xdg), _) => PathBuf::from(xdg).join(APP_DIR),
        (None, Some(home)) => home.join(fallback).join(APP_DIR),
        (None, None) => PathBuf::from(fallback).join(APP_DIR),
    }
}
