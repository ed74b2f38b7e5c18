//! Loading of `RagConfig` from disk and the environment.
//!
//! Layers apply in order: built-in defaults, then the TOML file, then
//! `LEXRAG_*` environment variables. The merged result is validated before
//! it is returned.

use crate::paths::LexragPaths;
use lexrag_core::config::RagConfig;
use lexrag_core::error::{LexragError, Result};
use std::path::Path;

/// Environment variables that hold the LLM API key, in lookup order.
pub const API_KEY_VARS: &[&str] = &["GROQ_API_KEY", "LEXRAG_API_KEY"];

/// Loads the configuration from `path`, or from the default config file
/// when `path` is `None`, and applies environment overrides.
///
/// A missing default file is not an error; a missing explicit file is.
pub fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<RagConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(LexragError::not_found(
                    "config file",
                    explicit.display().to_string(),
                ));
            }
            read_config_file(explicit)?
        }
        None => match LexragPaths::config_file() {
            Ok(default_path) if default_path.exists() => read_config_file(&default_path)?,
            _ => RagConfig::default(),
        },
    };

    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;
    Ok(config)
}

/// Parses one TOML file. An empty file yields the defaults.
pub fn read_config_file(path: &Path) -> Result<RagConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        LexragError::config(format!(
            "Failed to read config file at {}: {}",
            path.display(),
            e
        ))
    })?;

    if content.trim().is_empty() {
        return Ok(RagConfig::default());
    }

    toml::from_str(&content).map_err(|e| {
        LexragError::config(format!(
            "Failed to parse TOML from {}: {}",
            path.display(),
            e
        ))
    })
}

/// Overrides fields from `LEXRAG_*` variables.
///
/// # Errors
///
/// Returns `LexragError::Config` when a variable is set but unparsable.
pub fn apply_env_overrides<F>(config: &mut RagConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("LEXRAG_CHUNK_SIZE") {
        config.chunk_size = parse_var("LEXRAG_CHUNK_SIZE", &value)?;
    }
    if let Some(value) = lookup("LEXRAG_CHUNK_OVERLAP") {
        config.chunk_overlap = parse_var("LEXRAG_CHUNK_OVERLAP", &value)?;
    }
    if let Some(value) = lookup("LEXRAG_MAX_RETRIEVAL_DOCS") {
        config.max_retrieval_docs = parse_var("LEXRAG_MAX_RETRIEVAL_DOCS", &value)?;
    }
    if let Some(value) = lookup("LEXRAG_MIN_CONFIDENCE") {
        config.min_confidence_threshold = parse_var("LEXRAG_MIN_CONFIDENCE", &value)?;
    }
    if let Some(value) = lookup("LEXRAG_MAX_ITERATIONS") {
        config.max_correction_iterations = parse_var("LEXRAG_MAX_ITERATIONS", &value)?;
    }
    if let Some(value) = lookup("LEXRAG_LLM_MODEL") {
        config.llm_model = value;
    }
    if let Some(value) = lookup("LEXRAG_LLM_BASE_URL") {
        config.llm_base_url = value;
    }
    Ok(())
}

/// First non-empty API key among [`API_KEY_VARS`].
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LexragError::config(format!("{name} has an invalid value '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_then_env_layering() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size = 500\nchunk_overlap = 50\nmax_correction_iterations = 5").unwrap();

        let config = load_config_with(
            Some(file.path()),
            env(&[("LEXRAG_MAX_ITERATIONS", "2"), ("LEXRAG_LLM_MODEL", "llama-3.1-8b")]),
        )
        .unwrap();

        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.max_correction_iterations, 2);
        assert_eq!(config.llm_model, "llama-3.1-8b");
        assert_eq!(config.max_retrieval_docs, 5);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = load_config_with(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config, RagConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config_with(Some(Path::new("/nonexistent/lexrag.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, LexragError::NotFound { .. }));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_config_with(
            Some(file.path()),
            env(&[("LEXRAG_MIN_CONFIDENCE", "1.5")]),
        )
        .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("min_confidence_threshold"));
    }

    #[test]
    fn unparsable_env_value_is_a_config_error() {
        let mut config = RagConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("LEXRAG_CHUNK_SIZE", "big")]))
            .unwrap_err();
        assert!(err.to_string().contains("LEXRAG_CHUNK_SIZE"));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size = [").unwrap();
        assert!(read_config_file(file.path()).unwrap_err().is_config());
    }
}
