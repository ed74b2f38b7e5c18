//! Runtime plumbing for LEXRAG front-ends: subscriber setup and the live
//! refinement event stream.

pub mod telemetry;
pub mod tracing_layer;

pub use telemetry::init_tracing;
pub use tracing_layer::{RefinementEvent, RefinementEventLayer};
