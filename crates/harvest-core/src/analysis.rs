//! Evidence validation results.

use serde::{Deserialize, Serialize};

/// Confidence reported by a fallback analysis.
pub const FALLBACK_CONFIDENCE: f64 = 0.25;

/// Reason attached to checklist items that were not checked.
pub const FALLBACK_REASON: &str = "could not validate automatically";

/// Overall verdict on a request's evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Approve,
    Review,
    Reject,
}

impl Verdict {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPROVE" => Some(Verdict::Approve),
            "REVIEW" => Some(Verdict::Review),
            "REJECT" => Some(Verdict::Reject),
            _ => None,
        }
    }
}

/// Outcome of a single checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChecklistStatus {
    Pass,
    Fail,
    Missing,
}

impl ChecklistStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PASS" => Some(ChecklistStatus::Pass),
            "FAIL" => Some(ChecklistStatus::Fail),
            "MISSING" => Some(ChecklistStatus::Missing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistOutcome {
    pub item: String,
    pub status: ChecklistStatus,
    pub reason: String,
}

/// Result of validating a request's evidence against a checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationAnalysis {
    pub verdict: Verdict,
    /// In [0, 1].
    pub confidence: f64,
    pub checklist: Vec<ChecklistOutcome>,
    pub missing: Vec<String>,
    /// True when produced without a usable service answer.
    pub fallback: bool,
}

impl ValidationAnalysis {
    /// Conservative analysis used when the service cannot be relied on.
    ///
    /// Every checklist item is `MISSING`. The verdict is `REVIEW` when there is
    /// at least one piece of evidence, `REJECT` otherwise.
    pub fn fallback(checklist: &[String], has_evidence: bool) -> Self {
        Self {
            verdict: if has_evidence {
                Verdict::Review
            } else {
                Verdict::Reject
            },
            confidence: FALLBACK_CONFIDENCE,
            checklist: checklist
                .iter()
                .map(|item| ChecklistOutcome {
                    item: item.clone(),
                    status: ChecklistStatus::Missing,
                    reason: FALLBACK_REASON.to_string(),
                })
                .collect(),
            missing: checklist.to_vec(),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_with_evidence() {
        let checklist = vec!["a".to_string(), "b".to_string()];
        let analysis = ValidationAnalysis::fallback(&checklist, true);

        assert_eq!(analysis.verdict, Verdict::Review);
        assert_eq!(analysis.confidence, FALLBACK_CONFIDENCE);
        assert!(analysis.fallback);
        assert_eq!(analysis.missing, checklist);
        assert!(analysis
            .checklist
            .iter()
            .all(|o| o.status == ChecklistStatus::Missing));
    }

    #[test]
    fn test_fallback_without_evidence() {
        let analysis = ValidationAnalysis::fallback(&["a".to_string()], false);
        assert_eq!(analysis.verdict, Verdict::Reject);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Verdict::Approve).unwrap(), "\"APPROVE\"");
        assert_eq!(Verdict::parse("REVIEW"), Some(Verdict::Review));
        assert_eq!(Verdict::parse("review"), None);
        assert_eq!(ChecklistStatus::parse("MISSING"), Some(ChecklistStatus::Missing));
    }
}
