//! Error types for the LEXRAG system.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire LEXRAG workspace.
///
/// Variants are grouped by how the system treats them: everything here is
/// fatal for the operation that raised it. Recoverable conditions (such as a
/// malformed verifier verdict) never surface as a `LexragError`.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum LexragError {
    /// Configuration rejected at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// File extension is not on the allow-list or has no text extractor
    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType { extension: String, reason: String },

    /// File exceeds the configured upload limit
    #[error("File is too large: {size_mb:.1}MB. Maximum allowed: {max_mb}MB")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    /// Search was attempted before any document was indexed
    #[error("No documents loaded. Please upload documents first")]
    IndexEmpty,

    /// Corpus index failure other than emptiness
    #[error("Corpus index error: {0}")]
    Index(String),

    /// A language-model call failed during the named refinement stage
    #[error("LLM call failed during {stage}: {message}")]
    Llm {
        stage: String,
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    /// Caller supplied an unusable argument (e.g. a blank question)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session store failure
    #[error("Session error: {0}")]
    Session(String),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation exceeded its time budget
    #[error("Operation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LexragError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an Llm error that is not retryable
    pub fn llm(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Llm {
            stage: stage.into(),
            message: message.into(),
            status_code: None,
            retryable: false,
        }
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a Session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Re-labels an `Llm` error with the refinement stage it occurred in.
    ///
    /// Transport clients do not know which stage called them; the strategy
    /// objects attach it. Other variants pass through untouched.
    pub fn in_stage(self, stage: &str) -> Self {
        match self {
            Self::Llm {
                message,
                status_code,
                retryable,
                ..
            } => Self::Llm {
                stage: stage.to_string(),
                message,
                status_code,
                retryable,
            },
            other => other,
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this error was raised because nothing is indexed yet
    pub fn is_index_empty(&self) -> bool {
        matches!(self, Self::IndexEmpty)
    }

    /// Check if a retry of the same request might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Human-readable message suitable for showing to an end user.
    ///
    /// Never contains secrets; upstream response bodies are already reduced
    /// to their error message by the transport client.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("The system is misconfigured: {msg}"),
            Self::UnsupportedFileType { extension, reason } => {
                format!("Unsupported file type '{extension}': {reason}")
            }
            Self::FileTooLarge { .. } | Self::IndexEmpty => self.to_string(),
            Self::NotFound { entity_type, id } => format!("{entity_type} not found: {id}"),
            Self::Llm { stage, message, .. } => {
                format!("The language model failed while {stage}: {message}")
            }
            Self::Cancelled => "The query was cancelled before it finished".to_string(),
            Self::Timeout { secs } => {
                format!("The query did not finish within {secs} seconds, please retry")
            }
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LexragError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for LexragError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LexragError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at adapter boundaries)
impl From<anyhow::Error> for LexragError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, LexragError>`.
pub type Result<T> = std::result::Result<T, LexragError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_stage_relabels_llm_errors_only() {
        let err = LexragError::llm("transport", "connection reset").in_stage("generating");
        assert!(matches!(err, LexragError::Llm { ref stage, .. } if stage == "generating"));

        let untouched = LexragError::IndexEmpty.in_stage("generating");
        assert_eq!(untouched, LexragError::IndexEmpty);
    }

    #[test]
    fn file_too_large_message_matches_limit() {
        let err = LexragError::FileTooLarge {
            size_mb: 51.34,
            max_mb: 50,
        };
        assert_eq!(
            err.user_message(),
            "File is too large: 51.3MB. Maximum allowed: 50MB"
        );
    }

    #[test]
    fn retryable_classification() {
        let err = LexragError::Llm {
            stage: "verifying".into(),
            message: "rate limited".into(),
            status_code: Some(429),
            retryable: true,
        };
        assert!(err.is_retryable());
        assert!(LexragError::Timeout { secs: 5 }.is_retryable());
        assert!(!LexragError::IndexEmpty.is_retryable());
    }

    #[test]
    fn io_error_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LexragError = io.into();
        match err {
            LexragError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
