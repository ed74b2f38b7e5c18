//! Strategy ports for the three LLM-backed refinement steps.
//!
//! Implementations are stateless transformations; everything they need is
//! passed in and everything they produce goes back into the refinement state.

use super::verdict::Verdict;
use crate::error::Result;
use async_trait::async_trait;

/// Produces a draft answer from a question and its retrieved context.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, question: &str, context: &[String]) -> Result<String>;
}

/// Judges an answer against its context.
///
/// # Contract
///
/// Must not fail on malformed model output: undecodable output maps to
/// [`Verdict::degraded`]. An `Err` is reserved for the underlying call
/// failing outright.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, question: &str, answer: &str, context: &[String]) -> Result<Verdict>;
}

/// Rewrites an answer to address the issues found so far.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn correct(
        &self,
        question: &str,
        answer: &str,
        context: &[String],
        issues: &[String],
    ) -> Result<String>;
}
