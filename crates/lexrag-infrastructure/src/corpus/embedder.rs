//! Text embeddings for the corpus index.
//!
//! Every [`Embedder`] returns L2-normalized vectors, so cosine similarity
//! is a plain dot product.

use lexrag_core::config::{EmbeddingModelId, RagConfig};
use lexrag_core::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps text to dense vectors of a fixed width.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds several texts; implementations with batched inference override this.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Builds the embedder named by `config.embedding_model`.
///
/// # Errors
///
/// `LexragError::Config` for an unknown model id, or for a model this
/// build cannot run.
pub fn embedder_from_config(config: &RagConfig) -> Result<Arc<dyn Embedder>> {
    match config.embedding_model_id()? {
        EmbeddingModelId::HashedTfIdf => {
            Ok(Arc::new(HashedTfIdfEmbedder::new(config.embedding_dimensions)))
        }
        #[cfg(feature = "fastembed")]
        EmbeddingModelId::AllMiniLmL6V2 => Ok(Arc::new(
            super::sentence::SentenceEmbedder::all_minilm_l6_v2()?,
        )),
        #[cfg(not(feature = "fastembed"))]
        model @ EmbeddingModelId::AllMiniLmL6V2 => Err(lexrag_core::LexragError::config(format!(
            "embedding_model '{model}' needs a build with the `fastembed` feature"
        ))),
    }
}

/// Scales `vector` to unit length in place; zero vectors stay zero.
pub(crate) fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector {
            *value /= norm;
        }
    }
}

/// Terms hashed into fixed-dimension buckets with FNV-1a, weighted by term
/// frequency times a length-based IDF approximation.
#[derive(Debug, Clone)]
pub struct HashedTfIdfEmbedder {
    dimensions: usize,
}

impl HashedTfIdfEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dimensions];
        if tokens.is_empty() {
            return vector;
        }

        let mut tf: HashMap<&str, f32> = HashMap::new();
        for token in &tokens {
            *tf.entry(token.as_str()).or_default() += 1.0;
        }

        let total = tokens.len() as f32;
        for (term, count) in tf {
            let idf = 1.0 + (term.chars().count() as f32).ln();
            vector[bucket(term, self.dimensions)] += (count / total) * idf;
        }

        normalize(&mut vector);
        vector
    }
}

impl Embedder for HashedTfIdfEmbedder {
    fn model_id(&self) -> &str {
        "tfidf-hash-384"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}

/// Cosine similarity of two L2-normalized vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

fn bucket(term: &str, dimensions: usize) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in term.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % dimensions as u64) as usize
}
