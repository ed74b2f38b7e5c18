//! Application layer for LEXRAG.
//!
//! Coordinates the domain ports into the question-answering use case:
//! prompt rendering, LLM-backed strategies, the refinement controller,
//! session serialisation and the `LegalRagService` facade.

pub mod controller;
pub mod prompts;
pub mod rag_service;
pub mod session;
pub mod strategies;

pub use controller::RefinementController;
pub use rag_service::{LegalRagService, SystemStats};
