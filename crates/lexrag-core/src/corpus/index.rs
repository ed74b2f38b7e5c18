//! Corpus index port.

use super::model::{IndexStats, IngestOutcome, RetrievedChunk};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A searchable store of document chunks.
///
/// # Contract
///
/// - `search` ranks deterministically: the same query against the same index
///   state yields the same ordering.
/// - `ingest` is idempotent per unique file content; a repeat reports
///   `chunks_added == 0`.
/// - Content ingested before a `search` call is visible to that call.
#[async_trait]
pub trait CorpusIndex: Send + Sync {
    /// Loads, chunks and indexes one file.
    async fn ingest(&self, path: &Path) -> Result<IngestOutcome>;

    /// Returns up to `k` chunks for `query`, best first.
    ///
    /// # Errors
    ///
    /// `LexragError::IndexEmpty` when nothing has been indexed.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>>;

    async fn stats(&self) -> IndexStats;

    /// Drops every indexed chunk.
    async fn clear(&self) -> Result<()>;

    /// Indexes several files, stopping at the first failure.
    ///
    /// Callers that need per-file isolation call [`CorpusIndex::ingest`]
    /// in a loop instead.
    async fn index(&self, files: &[PathBuf]) -> Result<Vec<IngestOutcome>> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            outcomes.push(self.ingest(file).await?);
        }
        Ok(outcomes)
    }
}
