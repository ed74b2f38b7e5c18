//! Sentence-transformer embeddings through fastembed (ONNX Runtime).

use super::embedder::{Embedder, normalize};
use crate::paths::LexragPaths;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use lexrag_core::error::{LexragError, Result};
use std::sync::Mutex;

/// all-MiniLM-L6-v2 run locally; weights are downloaded on first use.
pub struct SentenceEmbedder {
    // fastembed needs `&mut` to run inference
    model: Mutex<TextEmbedding>,
    model_id: &'static str,
    dimensions: usize,
}

impl SentenceEmbedder {
    pub fn all_minilm_l6_v2() -> Result<Self> {
        let mut options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        if let Ok(dir) = LexragPaths::models_dir() {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options).map_err(|e| {
            LexragError::config(format!("failed to load embedding model all-MiniLM-L6-v2: {e}"))
        })?;
        tracing::info!(model = "all-MiniLM-L6-v2", "Embedding model loaded");

        Ok(Self {
            model: Mutex::new(model),
            model_id: "sentence-transformers/all-MiniLM-L6-v2",
            dimensions: 384,
        })
    }
}

impl Embedder for SentenceEmbedder {
    fn model_id(&self) -> &str {
        self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| LexragError::Index("embedding model returned no vector".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| LexragError::internal("embedding model lock poisoned"))?;
        let mut vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| LexragError::Index(format!("embedding failed: {e}")))?;

        for vector in &mut vectors {
            if vector.len() != self.dimensions {
                return Err(LexragError::Index(format!(
                    "embedding width {} does not match {}",
                    vector.len(),
                    self.dimensions
                )));
            }
            normalize(vector);
        }
        Ok(vectors)
    }
}
