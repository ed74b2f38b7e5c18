//! Structured verifier output and its decoding policy.

use super::state::{CorrectionRecord, VerificationStatus};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Confidence assigned when the verifier's output cannot be decoded.
///
/// Kept at the neutral midpoint so a degraded verdict always triggers a
/// correction round under the default threshold without claiming failure.
pub const DEGRADED_CONFIDENCE: f64 = 0.5;

/// The verifier's judgement of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerificationStatus,
    /// Always within [0, 1]
    pub confidence: f64,
    pub issues: Vec<String>,
    pub missing_information: Vec<String>,
    pub legal_concerns: Vec<String>,
    /// `true` when this verdict was synthesized from undecodable output
    #[serde(default)]
    pub degraded: bool,
}

/// Reasons verifier output was rejected as malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerdictParseError {
    #[error("verifier output contains no JSON object")]
    NoJsonObject,
    #[error("verifier JSON does not match the verdict shape: {0}")]
    Shape(String),
    #[error("unknown verification status '{0}'")]
    UnknownStatus(String),
    #[error("confidence is not a finite number")]
    NonFiniteConfidence,
}

#[derive(Deserialize)]
struct VerdictWire {
    verification_status: String,
    confidence: f64,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    missing_information: Vec<String>,
    #[serde(default)]
    legal_concerns: Vec<String>,
}

impl Verdict {
    /// Decodes raw verifier text into a verdict.
    ///
    /// Tolerates prose, markdown fences and `<think>` blocks around the JSON
    /// object. Out-of-range confidence values are clamped into [0, 1].
    pub fn parse(raw: &str) -> Result<Self, VerdictParseError> {
        let body = extract_json_object(raw).ok_or(VerdictParseError::NoJsonObject)?;
        let wire: VerdictWire =
            serde_json::from_str(body).map_err(|e| VerdictParseError::Shape(e.to_string()))?;

        let status = parse_status(&wire.verification_status)?;
        if !wire.confidence.is_finite() {
            return Err(VerdictParseError::NonFiniteConfidence);
        }

        Ok(Self {
            status,
            confidence: wire.confidence.clamp(0.0, 1.0),
            issues: wire.issues,
            missing_information: wire.missing_information,
            legal_concerns: wire.legal_concerns,
            degraded: false,
        })
    }

    /// Decodes `raw`, falling back to [`Verdict::degraded`] on any error.
    pub fn parse_or_degraded(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|_| Self::degraded())
    }

    /// Conservative verdict used when verifier output is malformed.
    pub fn degraded() -> Self {
        Self {
            status: VerificationStatus::NeedsCorrection,
            confidence: DEGRADED_CONFIDENCE,
            issues: Vec::new(),
            missing_information: Vec::new(),
            legal_concerns: Vec::new(),
            degraded: true,
        }
    }

    /// Convenience constructor for a clean pass.
    pub fn verified(confidence: f64) -> Self {
        Self {
            status: VerificationStatus::Verified,
            confidence: confidence.clamp(0.0, 1.0),
            issues: Vec::new(),
            missing_information: Vec::new(),
            legal_concerns: Vec::new(),
            degraded: false,
        }
    }

    /// Convenience constructor for a failing verdict with issues.
    pub fn needs_correction(confidence: f64, issues: Vec<String>) -> Self {
        Self {
            status: VerificationStatus::NeedsCorrection,
            confidence: confidence.clamp(0.0, 1.0),
            issues,
            missing_information: Vec::new(),
            legal_concerns: Vec::new(),
            degraded: false,
        }
    }

    /// Log entries this verdict appends: issues, then missing information,
    /// then legal concerns; or the single parse-error sentinel when degraded.
    pub fn findings(&self) -> Vec<CorrectionRecord> {
        if self.degraded {
            return vec![CorrectionRecord::VerificationParseError];
        }

        self.issues
            .iter()
            .chain(&self.missing_information)
            .chain(&self.legal_concerns)
            .cloned()
            .map(CorrectionRecord::Issue)
            .collect()
    }
}

fn parse_status(raw: &str) -> Result<VerificationStatus, VerdictParseError> {
    let normalized = raw.trim().replace([' ', '-'], "_");
    match VerificationStatus::from_str(&normalized) {
        Ok(VerificationStatus::Unverified) | Err(_) => {
            Err(VerdictParseError::UnknownStatus(raw.to_string()))
        }
        Ok(status) => Ok(status),
    }
}

/// Returns the outermost `{ ... }` span after dropping reasoning blocks.
fn extract_json_object(raw: &str) -> Option<&str> {
    let visible = match raw.rfind("</think>") {
        Some(end) => &raw[end + "</think>".len()..],
        None => raw,
    };
    let start = visible.find('{')?;
    let end = visible.rfind('}')?;
    (end > start).then(|| &visible[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let raw = r#"{
            "verification_status": "VERIFIED",
            "confidence": 0.92,
            "issues": [],
            "missing_information": [],
            "legal_concerns": []
        }"#;
        let verdict = Verdict::parse(raw).unwrap();
        assert_eq!(verdict.status, VerificationStatus::Verified);
        assert_eq!(verdict.confidence, 0.92);
        assert!(verdict.findings().is_empty());
        assert!(!verdict.degraded);
    }

    #[test]
    fn parses_fenced_json_after_reasoning() {
        let raw = "<think>{\"scratch\": true}</think>\nHere you go:\n```json\n{\"verification_status\": \"NEEDS_CORRECTION\", \"confidence\": 0.4, \"issues\": [\"uncited claim\"]}\n```";
        let verdict = Verdict::parse(raw).unwrap();
        assert_eq!(verdict.status, VerificationStatus::NeedsCorrection);
        assert_eq!(verdict.issues, vec!["uncited claim"]);
        assert!(verdict.missing_information.is_empty());
    }

    #[test]
    fn findings_concatenate_in_order() {
        let verdict = Verdict {
            status: VerificationStatus::NeedsCorrection,
            confidence: 0.3,
            issues: vec!["a".into()],
            missing_information: vec!["b".into()],
            legal_concerns: vec!["c".into()],
            degraded: false,
        };
        let rendered: Vec<String> = verdict.findings().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a", "b", "c"]);
    }

    #[test]
    fn clamps_confidence() {
        let verdict =
            Verdict::parse(r#"{"verification_status": "VERIFIED", "confidence": 7}"#).unwrap();
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn accepts_spaced_status() {
        let verdict =
            Verdict::parse(r#"{"verification_status": "needs correction", "confidence": 0.2}"#)
                .unwrap();
        assert_eq!(verdict.status, VerificationStatus::NeedsCorrection);
    }

    #[test]
    fn rejects_prose() {
        assert_eq!(
            Verdict::parse("The answer looks fine to me."),
            Err(VerdictParseError::NoJsonObject)
        );
    }

    #[test]
    fn rejects_missing_status() {
        let err = Verdict::parse(r#"{"confidence": 0.9}"#).unwrap_err();
        assert!(matches!(err, VerdictParseError::Shape(_)));
    }

    #[test]
    fn rejects_unverified_status() {
        let err =
            Verdict::parse(r#"{"verification_status": "UNVERIFIED", "confidence": 0.9}"#)
                .unwrap_err();
        assert!(matches!(err, VerdictParseError::UnknownStatus(_)));
    }

    #[test]
    fn degraded_verdict_is_conservative() {
        let verdict = Verdict::parse_or_degraded("{not json");
        assert_eq!(verdict.status, VerificationStatus::NeedsCorrection);
        assert_eq!(verdict.confidence, DEGRADED_CONFIDENCE);
        assert_eq!(
            verdict.findings(),
            vec![CorrectionRecord::VerificationParseError]
        );
    }
}
