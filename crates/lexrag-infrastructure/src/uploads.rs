//! Upload validation and storage.

use lexrag_core::config::{RagConfig, normalize_extension};
use lexrag_core::error::{LexragError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Checks that `path` exists, has an allowed extension and fits the size
/// limit. Returns the file size in megabytes.
pub async fn validate_upload(path: &Path, config: &RagConfig) -> Result<f64> {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(LexragError::not_found("file", path.display().to_string())),
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_extension)
        .unwrap_or_default();
    if !config.allows_extension(&extension) {
        return Err(LexragError::UnsupportedFileType {
            extension,
            reason: format!("allowed types are {}", config.allowed_extensions.join(", ")),
        });
    }

    let size_mb = metadata.len() as f64 / BYTES_PER_MB;
    if size_mb > config.max_file_size_mb as f64 {
        return Err(LexragError::FileTooLarge {
            size_mb,
            max_mb: config.max_file_size_mb,
        });
    }

    Ok(size_mb)
}

/// Copies `source` into `uploads_dir`, never overwriting an existing file.
///
/// A name collision yields `name_1.ext`, `name_2.ext` and so on.
pub async fn save_upload(source: &Path, uploads_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(uploads_dir).await?;

    let file_name = source
        .file_name()
        .ok_or_else(|| LexragError::io(format!("{} has no file name", source.display())))?;
    let target = unique_path(uploads_dir, Path::new(file_name)).await;

    fs::copy(source, &target).await?;
    tracing::debug!(from = %source.display(), to = %target.display(), "Upload saved");
    Ok(target)
}

async fn unique_path(dir: &Path, file_name: &Path) -> PathBuf {
    let candidate = dir.join(file_name);
    if !fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = file_name
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}_{counter}{suffix}"));
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        counter += 1;
    }
}
