//! Corpus adapters: loading, chunking, embedding and the in-memory index.

mod chunker;
mod embedder;
mod extractors;
mod loader;
mod memory_index;
#[cfg(feature = "fastembed")]
mod sentence;

pub use chunker::{DEFAULT_SEPARATORS, RecursiveChunker};
pub use embedder::{Embedder, HashedTfIdfEmbedder, cosine, embedder_from_config};
pub use extractors::{DocxExtractor, PdfExtractor};
pub use loader::{DocumentLoader, LoadedDocument, PlainTextExtractor, TextExtractor};
pub use memory_index::{DocumentInfo, InMemoryCorpusIndex};
#[cfg(feature = "fastembed")]
pub use sentence::SentenceEmbedder;
