//! Session domain module.
//!
//! - `model`: `Session`, `Checkpoint`, `CheckpointPhase`, `Exchange`
//! - `store`: `SessionStore` and `CheckpointSink` ports

mod model;
mod store;

pub use model::{Checkpoint, CheckpointPhase, DEFAULT_SESSION_ID, Exchange, Session};
pub use store::{CheckpointSink, DiscardCheckpoints, SessionStore};
