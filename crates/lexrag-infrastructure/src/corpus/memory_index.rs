//! In-process corpus index.

use super::chunker::RecursiveChunker;
use super::embedder::{Embedder, cosine, embedder_from_config};
use super::loader::DocumentLoader;
use async_trait::async_trait;
use lexrag_core::config::RagConfig;
use lexrag_core::corpus::{CorpusIndex, IndexStats, IngestOutcome, RetrievedChunk};
use lexrag_core::error::{LexragError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

struct IndexedChunk {
    text: String,
    source_id: String,
    vector: Vec<f32>,
}

/// Metadata recorded for every indexed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub source_id: String,
    pub extension: String,
    pub size_mb: f64,
    pub content_hash: String,
    pub chunk_count: usize,
}

#[derive(Default)]
struct IndexInner {
    /// Chunks in insertion order; ties in ranking fall back to this order
    chunks: Vec<IndexedChunk>,
    /// Content hash -> position in `documents`
    by_hash: HashMap<String, usize>,
    /// Documents in ingestion order
    documents: Vec<DocumentInfo>,
}

/// A corpus index held entirely in memory.
///
/// Documents are deduplicated by the BLAKE3 hash of their bytes, so the
/// same content uploaded under two names is indexed once.
pub struct InMemoryCorpusIndex {
    loader: DocumentLoader,
    chunker: RecursiveChunker,
    embedder: Arc<dyn Embedder>,
    max_k: usize,
    inner: RwLock<IndexInner>,
}

impl InMemoryCorpusIndex {
    pub fn new(
        loader: DocumentLoader,
        chunker: RecursiveChunker,
        embedder: Arc<dyn Embedder>,
        max_k: usize,
    ) -> Self {
        Self {
            loader,
            chunker,
            embedder,
            max_k: max_k.max(1),
            inner: RwLock::new(IndexInner::default()),
        }
    }

    /// Builds the index described by `config`.
    ///
    /// # Errors
    ///
    /// `LexragError::Config` when an allowed extension has no text extractor
    /// or the embedding model cannot be set up.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let loader = DocumentLoader::new(config.max_file_size_mb);
        loader.ensure_supports(&config.allowed_extensions)?;
        let embedder = embedder_from_config(config)?;
        tracing::debug!(
            embedding_model = embedder.model_id(),
            dimensions = embedder.dimensions(),
            "Corpus index configured"
        );

        Ok(Self::new(
            loader,
            RecursiveChunker::new(config.chunk_size, config.chunk_overlap),
            embedder,
            config.max_retrieval_docs,
        ))
    }

    /// Indexed documents in ingestion order.
    pub async fn documents(&self) -> Vec<DocumentInfo> {
        self.inner.read().await.documents.clone()
    }
}

impl IndexInner {
    fn find(&self, content_hash: &str) -> Option<&DocumentInfo> {
        self.by_hash
            .get(content_hash)
            .and_then(|&position| self.documents.get(position))
    }
}

#[async_trait]
impl CorpusIndex for InMemoryCorpusIndex {
    async fn ingest(&self, path: &Path) -> Result<IngestOutcome> {
        let document = self.loader.load(path).await?;

        if let Some(existing) = self.inner.read().await.find(&document.content_hash) {
            tracing::debug!(
                source = %document.source_id,
                indexed_as = %existing.source_id,
                "Skipping already indexed content"
            );
            return Ok(IngestOutcome {
                chunks_added: 0,
                total_chunks: existing.chunk_count,
                already_indexed: true,
            });
        }

        let pieces = self.chunker.split(&document.text);
        let embedder = self.embedder.clone();
        let (pieces, vectors) = tokio::task::spawn_blocking(move || {
            let vectors = embedder.embed_batch(&pieces);
            (pieces, vectors)
        })
        .await
        .map_err(|e| LexragError::internal(format!("embedding task failed: {e}")))?;
        let chunks: Vec<IndexedChunk> = pieces
            .into_iter()
            .zip(vectors?)
            .map(|(text, vector)| IndexedChunk {
                vector,
                source_id: document.source_id.clone(),
                text,
            })
            .collect();

        let mut inner = self.inner.write().await;
        // Another ingest of the same bytes may have won while we were chunking.
        if let Some(existing) = inner.find(&document.content_hash) {
            return Ok(IngestOutcome {
                chunks_added: 0,
                total_chunks: existing.chunk_count,
                already_indexed: true,
            });
        }

        let added = chunks.len();
        inner.chunks.extend(chunks);
        let position = inner.documents.len();
        inner.by_hash.insert(document.content_hash.clone(), position);
        inner.documents.push(DocumentInfo {
            source_id: document.source_id.clone(),
            extension: document.extension,
            size_mb: document.size_mb,
            content_hash: document.content_hash,
            chunk_count: added,
        });

        tracing::info!(
            source = %document.source_id,
            chunks = added,
            size_mb = document.size_mb,
            "Indexed document"
        );

        Ok(IngestOutcome {
            chunks_added: added,
            total_chunks: added,
            already_indexed: false,
        })
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let inner = self.inner.read().await;
        if inner.chunks.is_empty() {
            return Err(LexragError::IndexEmpty);
        }

        let k = k.clamp(1, self.max_k);
        let query_vector = self.embedder.embed(query)?;

        let mut scored: Vec<(usize, f32)> = inner
            .chunks
            .iter()
            .enumerate()
            .map(|(position, chunk)| (position, cosine(&query_vector, &chunk.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, score)| {
                let chunk = &inner.chunks[position];
                RetrievedChunk::new(chunk.text.clone(), chunk.source_id.clone()).with_score(score)
            })
            .collect())
    }

    async fn stats(&self) -> IndexStats {
        let inner = self.inner.read().await;
        IndexStats {
            total_documents: inner.documents.len(),
            total_chunks: inner.chunks.len(),
            processed_files: inner.documents.len(),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.chunks.clear();
        inner.by_hash.clear();
        inner.documents.clear();
        tracing::info!("Corpus index cleared");
        Ok(())
    }
}
