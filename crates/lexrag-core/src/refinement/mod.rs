//! Refinement domain module.
//!
//! This module contains the state record of the
//! retrieve → generate → verify → (correct → verify)* → finalize machine,
//! the verifier verdict, the final response and the pure transitions between
//! states.
//!
//! # Module Structure
//!
//! - `state`: `RefinementState`, `VerificationStatus`, `CorrectionRecord`
//! - `verdict`: `Verdict` and the malformed-output policy
//! - `transition`: `Step`, `decide`, `next_step` and one `apply_*` per step
//! - `response`: `RagResponse`
//! - `strategy`: `Generator`, `Verifier`, `Corrector` ports

mod response;
mod state;
mod strategy;
pub mod transition;
mod verdict;

pub use response::RagResponse;
pub use state::{CorrectionRecord, RefinementMetadata, RefinementState, VerificationStatus};
pub use strategy::{Corrector, Generator, Verifier};
pub use transition::{Decision, FinalizeReason, RefinementPolicy, Step, decide, next_step};
pub use verdict::{DEGRADED_CONFIDENCE, Verdict, VerdictParseError};
