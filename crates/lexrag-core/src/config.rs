//! Runtime configuration for the RAG pipeline.
//!
//! `RagConfig` is deserialized from TOML with every field defaulted, then
//! validated once at startup. A configuration that fails validation never
//! reaches the first query.

use crate::error::{LexragError, Result};
use crate::refinement::RefinementPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString, VariantNames};

pub const DEFAULT_LLM_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_EMBEDDING_MODEL: &str = "tfidf-hash-384";

/// Embedding schemes the corpus index can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(ascii_case_insensitive)]
pub enum EmbeddingModelId {
    /// Hashed TF-IDF computed in-process, width from `embedding_dimensions`
    #[strum(serialize = "tfidf-hash-384")]
    HashedTfIdf,
    /// all-MiniLM-L6-v2 sentence transformer run through ONNX
    #[strum(serialize = "sentence-transformers/all-MiniLM-L6-v2")]
    AllMiniLmL6V2,
}

impl EmbeddingModelId {
    /// Output width when the model fixes it.
    pub fn fixed_dimensions(self) -> Option<usize> {
        match self {
            Self::HashedTfIdf => None,
            Self::AllMiniLmL6V2 => Some(384),
        }
    }
}

/// Complete configuration surface of the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query (`k`)
    pub max_retrieval_docs: usize,
    /// Verifier confidence below which an answer is corrected
    pub min_confidence_threshold: f64,
    /// Hard cap on answer-producing LLM calls per query
    pub max_correction_iterations: u32,
    /// Identifier of the embedding scheme used by the corpus index
    pub embedding_model: String,
    /// Dense vector width for the embedding scheme
    pub embedding_dimensions: usize,
    /// Chat model identifier sent to the LLM endpoint
    pub llm_model: String,
    /// OpenAI-compatible chat completions endpoint
    pub llm_base_url: String,
    pub llm_temperature: f32,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// Budget for a whole query, across all refinement iterations
    pub query_timeout_secs: u64,
    /// Lower-case, dot-prefixed extensions accepted for ingestion
    pub allowed_extensions: Vec<String>,
    pub max_file_size_mb: u64,
    /// Where uploaded documents are copied before ingestion
    pub uploads_dir: Option<PathBuf>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_retrieval_docs: 5,
            min_confidence_threshold: 0.7,
            max_correction_iterations: 3,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: 384,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_temperature: 0.0,
            request_timeout_secs: 120,
            query_timeout_secs: 600,
            allowed_extensions: vec![".pdf".into(), ".docx".into(), ".txt".into()],
            max_file_size_mb: 50,
            uploads_dir: None,
        }
    }
}

impl RagConfig {
    /// Validates every field, collecting all problems into one error.
    ///
    /// # Errors
    ///
    /// Returns `LexragError::Config` listing each invalid field.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            problems.push(format!(
                "min_confidence_threshold must be within [0, 1], got {}",
                self.min_confidence_threshold
            ));
        }
        if self.max_correction_iterations < 1 {
            problems.push("max_correction_iterations must be at least 1".to_string());
        }
        if self.chunk_size == 0 {
            problems.push("chunk_size must be at least 1".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            problems.push(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.max_retrieval_docs == 0 {
            problems.push("max_retrieval_docs must be at least 1".to_string());
        }
        if self.embedding_dimensions == 0 {
            problems.push("embedding_dimensions must be at least 1".to_string());
        }
        if self.llm_model.trim().is_empty() {
            problems.push("llm_model must not be empty".to_string());
        }
        match self.embedding_model_id() {
            Ok(model) => match model.fixed_dimensions() {
                Some(width) if width != self.embedding_dimensions => problems.push(format!(
                    "embedding_dimensions must be {width} for '{model}', got {}",
                    self.embedding_dimensions
                )),
                _ => {}
            },
            Err(err) => problems.push(err.to_string()),
        }
        if !self.llm_base_url.starts_with("http://") && !self.llm_base_url.starts_with("https://")
        {
            problems.push(format!(
                "llm_base_url must be an http(s) URL, got '{}'",
                self.llm_base_url
            ));
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            problems.push(format!(
                "llm_temperature must be within [0, 2], got {}",
                self.llm_temperature
            ));
        }
        if self.request_timeout_secs == 0 || self.query_timeout_secs == 0 {
            problems.push("timeouts must be at least 1 second".to_string());
        }
        if self.allowed_extensions.is_empty() {
            problems.push("allowed_extensions must not be empty".to_string());
        }
        for ext in &self.allowed_extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                problems.push(format!("allowed extension '{ext}' must look like '.txt'"));
            }
        }
        if self.max_file_size_mb == 0 {
            problems.push("max_file_size_mb must be at least 1".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LexragError::config(problems.join("; ")))
        }
    }

    /// The configured embedding scheme.
    ///
    /// # Errors
    ///
    /// `LexragError::Config` when `embedding_model` names no known scheme.
    pub fn embedding_model_id(&self) -> Result<EmbeddingModelId> {
        self.embedding_model.trim().parse().map_err(|_| {
            LexragError::config(format!(
                "unknown embedding_model '{}', expected one of: {}",
                self.embedding_model,
                EmbeddingModelId::VARIANTS.join(", ")
            ))
        })
    }

    /// Returns `true` when `extension` (with or without leading dot, any case)
    /// is on the allow-list.
    pub fn allows_extension(&self, extension: &str) -> bool {
        let normalized = normalize_extension(extension);
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&normalized))
    }

    /// Refinement loop parameters derived from this configuration.
    pub fn refinement_policy(&self) -> RefinementPolicy {
        RefinementPolicy {
            min_confidence_threshold: self.min_confidence_threshold,
            max_iterations: self.max_correction_iterations,
            max_retrieval_docs: self.max_retrieval_docs,
        }
    }

    /// Secret-free projection for status reporting.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            model: self.llm_model.clone(),
            embedding_model: self.embedding_model.clone(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            max_retrieval_docs: self.max_retrieval_docs,
            confidence_threshold: self.min_confidence_threshold,
            max_iterations: self.max_correction_iterations,
            allowed_extensions: self.allowed_extensions.clone(),
            max_file_size_mb: self.max_file_size_mb,
        }
    }
}

/// Lower-cases an extension and ensures it carries a leading dot.
pub fn normalize_extension(extension: &str) -> String {
    let lower = extension.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// Read-only view of the active configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub model: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_retrieval_docs: usize,
    pub confidence_threshold: f64,
    pub max_iterations: u32,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_mb: u64,
}
