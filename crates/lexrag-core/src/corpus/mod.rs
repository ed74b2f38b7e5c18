//! Corpus domain module.
//!
//! Models and the port for the document index the refinement loop
//! retrieves context from.

mod index;
mod model;

pub use index::CorpusIndex;
pub use model::{IndexStats, IngestOutcome, IngestResult, IngestionReport, RetrievedChunk};
