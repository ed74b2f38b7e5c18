//! Unified path management for lexrag files.
//!
//! ```text
//! ~/.config/lexrag/            # Config directory
//! └── config.toml              # Optional configuration overrides
//!
//! ~/.local/share/lexrag/       # Data directory
//! ├── uploads/                 # Copies of ingested documents
//! ├── sessions/                # Session checkpoints (JSON store)
//! └── models/                  # Downloaded embedding model weights
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "lexrag";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves platform directories for lexrag.
pub struct LexragPaths;

impl LexragPaths {
    /// Returns the lexrag configuration directory (e.g. `~/.config/lexrag/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the lexrag data directory (e.g. `~/.local/share/lexrag/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the default uploads directory.
    pub fn uploads_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("uploads"))
    }

    /// Returns the default directory of the JSON session store.
    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("sessions"))
    }

    /// Returns the cache directory for embedding model weights.
    pub fn models_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("models"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_app_directories() {
        if let (Ok(config), Ok(dir)) = (LexragPaths::config_file(), LexragPaths::config_dir()) {
            assert_eq!(config.parent(), Some(dir.as_path()));
            assert!(dir.ends_with(APP_DIR));
        }
        if let Ok(uploads) = LexragPaths::uploads_dir() {
            assert!(uploads.ends_with("lexrag/uploads"));
        }
        if let Ok(models) = LexragPaths::models_dir() {
            assert!(models.ends_with("lexrag/models"));
        }
    }
}
