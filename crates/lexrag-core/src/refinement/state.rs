//! The record threaded through the refinement state machine.

use crate::corpus::RetrievedChunk;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Outcome of the most recent verification pass.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum VerificationStatus {
    /// No verification has run yet
    #[default]
    Unverified,
    /// The verifier judged the answer grounded and complete
    Verified,
    /// The verifier found problems that should be corrected
    NeedsCorrection,
}

/// One entry of the append-only corrections log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum CorrectionRecord {
    /// A problem reported by the verifier (issue, missing information or legal concern)
    Issue(String),
    /// The verifier's output could not be decoded
    VerificationParseError,
    /// The corrector rewrote the answer
    CorrectionApplied,
}

impl fmt::Display for CorrectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue(text) => f.write_str(text),
            Self::VerificationParseError => f.write_str("Verification parsing error"),
            Self::CorrectionApplied => f.write_str("Answer corrected based on verification"),
        }
    }
}

/// Retrieval statistics plus termination totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementMetadata {
    /// Number of chunks retrieved
    pub retrieved_docs: usize,
    /// Distinct source files among the retrieved chunks, in first-seen order
    pub source_files: Vec<String>,
    /// Character length of each retrieved chunk
    pub chunk_sizes: Vec<usize>,
    /// Set at FINALIZE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_iteration_count: Option<u32>,
    /// Set at FINALIZE: length of the corrections log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_corrections: Option<usize>,
}

impl RefinementMetadata {
    /// Builds retrieval statistics for a freshly retrieved context.
    pub fn from_chunks(chunks: &[RetrievedChunk]) -> Self {
        let mut source_files: Vec<String> = Vec::new();
        for chunk in chunks {
            if !source_files.contains(&chunk.source_id) {
                source_files.push(chunk.source_id.clone());
            }
        }

        Self {
            retrieved_docs: chunks.len(),
            source_files,
            chunk_sizes: chunks.iter().map(|c| c.text.chars().count()).collect(),
            final_iteration_count: None,
            total_corrections: None,
        }
    }
}

/// The single state value carried from step to step.
///
/// Fields are only writable through the transition functions in
/// [`super::transition`], which enforce the record's invariants:
/// context is set once, the corrections log only grows, and nothing changes
/// after finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementState {
    pub(crate) question: String,
    pub(crate) context: Vec<String>,
    pub(crate) sources: Vec<String>,
    pub(crate) retrieved: bool,
    pub(crate) answer: String,
    pub(crate) confidence: f64,
    pub(crate) verification_status: VerificationStatus,
    pub(crate) corrections_made: Vec<CorrectionRecord>,
    pub(crate) iteration_count: u32,
    pub(crate) verifications: u32,
    pub(crate) metadata: RefinementMetadata,
    pub(crate) finalized: bool,
}

impl RefinementState {
    /// Creates the initial state for a question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: Vec::new(),
            sources: Vec::new(),
            retrieved: false,
            answer: String::new(),
            confidence: 0.0,
            verification_status: VerificationStatus::Unverified,
            corrections_made: Vec::new(),
            iteration_count: 0,
            verifications: 0,
            metadata: RefinementMetadata::default(),
            finalized: false,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Whether RETRIEVE has populated the context.
    pub fn is_retrieved(&self) -> bool {
        self.retrieved
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn verification_status(&self) -> VerificationStatus {
        self.verification_status
    }

    pub fn corrections_made(&self) -> &[CorrectionRecord] {
        &self.corrections_made
    }

    /// Number of answer-producing calls (generation plus corrections).
    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    /// Number of completed verification passes.
    pub fn verifications(&self) -> u32 {
        self.verifications
    }

    /// Number of corrections applied so far.
    pub fn corrections_applied(&self) -> usize {
        self.corrections_made
            .iter()
            .filter(|r| matches!(r, CorrectionRecord::CorrectionApplied))
            .count()
    }

    pub fn metadata(&self) -> &RefinementMetadata {
        &self.metadata
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The retrieved context joined the way prompts consume it.
    pub fn joined_context(&self) -> String {
        self.context.join("\n\n")
    }

    /// The corrections log rendered one entry per line.
    pub fn issues_text(&self) -> String {
        self.corrections_made
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn new_state_starts_unverified_with_zero_confidence() {
        let state = RefinementState::new("What is the notice period?");
        assert_eq!(state.verification_status(), VerificationStatus::Unverified);
        assert_eq!(state.confidence(), 0.0);
        assert_eq!(state.iteration_count(), 0);
        assert!(state.corrections_made().is_empty());
        assert!(!state.is_retrieved());
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        assert_eq!(VerificationStatus::NeedsCorrection.to_string(), "NEEDS_CORRECTION");
        assert_eq!(
            VerificationStatus::from_str("verified").unwrap(),
            VerificationStatus::Verified
        );
        let json = serde_json::to_string(&VerificationStatus::NeedsCorrection).unwrap();
        assert_eq!(json, "\"NEEDS_CORRECTION\"");
    }

    #[test]
    fn correction_records_render_fixed_markers() {
        assert_eq!(
            CorrectionRecord::VerificationParseError.to_string(),
            "Verification parsing error"
        );
        assert_eq!(
            CorrectionRecord::CorrectionApplied.to_string(),
            "Answer corrected based on verification"
        );
        assert_eq!(CorrectionRecord::Issue("x".into()).to_string(), "x");
    }

    #[test]
    fn metadata_dedupes_source_files_in_order() {
        let chunks = vec![
            RetrievedChunk::new("abc", "lease.txt"),
            RetrievedChunk::new("de", "nda.txt"),
            RetrievedChunk::new("fghi", "lease.txt"),
        ];
        let metadata = RefinementMetadata::from_chunks(&chunks);
        assert_eq!(metadata.retrieved_docs, 3);
        assert_eq!(metadata.source_files, vec!["lease.txt", "nda.txt"]);
        assert_eq!(metadata.chunk_sizes, vec![3, 2, 4]);
    }
}
