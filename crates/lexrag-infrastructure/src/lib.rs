//! Infrastructure layer for LEXRAG.
//!
//! Adapters for the ports in `lexrag-core`: configuration loading, the
//! in-memory corpus index, session stores and upload handling.

pub mod config_storage;
pub mod corpus;
pub mod paths;
pub mod session_store;
pub mod uploads;

pub use config_storage::{api_key_from_env, load_config};
pub use corpus::InMemoryCorpusIndex;
pub use paths::LexragPaths;
pub use session_store::{InMemorySessionStore, JsonDirSessionStore};
