//! Corpus domain models.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A chunk returned by a search, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,
    /// Identifier of the document the chunk came from (file name)
    pub source_id: String,
    /// Similarity score; higher is closer
    #[serde(default)]
    pub score: f32,
}

impl RetrievedChunk {
    /// Creates a chunk with a zero score.
    pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            score: 0.0,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}

/// Result of ingesting one file into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Chunks added by this call; zero when the content was already indexed
    pub chunks_added: usize,
    /// Chunks the file's content occupies in the index
    pub total_chunks: usize,
    pub already_indexed: bool,
}

/// Aggregate counters of the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub processed_files: usize,
}

/// Per-file entry of an ingestion report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResult {
    pub file: PathBuf,
    pub success: bool,
    pub message: String,
    pub chunks_added: usize,
    pub total_chunks: usize,
}

impl IngestResult {
    pub fn succeeded(file: PathBuf, outcome: IngestOutcome) -> Self {
        let message = if outcome.already_indexed {
            "File already processed"
        } else {
            "Document processed successfully"
        };
        Self {
            file,
            success: true,
            message: message.to_string(),
            chunks_added: outcome.chunks_added,
            total_chunks: outcome.total_chunks,
        }
    }

    pub fn failed(file: PathBuf, message: impl Into<String>) -> Self {
        Self {
            file,
            success: false,
            message: message.into(),
            chunks_added: 0,
            total_chunks: 0,
        }
    }
}

/// Outcome of a batch ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub results: Vec<IngestResult>,
    /// Sum of `chunks_added` over successful files
    pub total_chunks_added: usize,
    pub index_stats: IndexStats,
}

impl IngestionReport {
    pub fn new(results: Vec<IngestResult>, index_stats: IndexStats) -> Self {
        let total_chunks_added = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.chunks_added)
            .sum();
        Self {
            results,
            total_chunks_added,
            index_stats,
        }
    }

    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}
