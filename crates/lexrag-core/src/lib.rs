//! Domain layer for LEXRAG.
//!
//! Types, ports and pure logic for answering questions about legal
//! documents with a bounded retrieve, generate, verify and correct loop.
//! Nothing in this crate performs I/O; adapters live in the
//! infrastructure and interaction crates.

pub mod config;
pub mod corpus;
pub mod error;
pub mod llm;
pub mod refinement;
pub mod session;

// Re-export common error type
pub use error::{LexragError, Result};
