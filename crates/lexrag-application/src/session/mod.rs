//! Session coordination: the single-writer gate and the checkpoint sink
//! that persists refinement progress into a session.

mod checkpointer;
mod gate;

pub use checkpointer::SessionCheckpointer;
pub use gate::SessionGate;
