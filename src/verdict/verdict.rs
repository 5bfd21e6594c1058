/// Verification result and its provenance
///
/// A round ends in exactly one of: a winning rendition, no winner, or a
/// classified error. The report carries how the candidate set evolved so
/// the decision can be audited after the fact.
use crate::classifier::client::TamperVerdicts;
use crate::config::types::{Evidence, Result, VerifyError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Pipeline stage that narrows the candidate set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Feature,
    Position,
    Intersect,
    Inference,
    Packet,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Feature => "feature",
            Stage::Position => "position",
            Stage::Intersect => "intersect",
            Stage::Inference => "inference",
            Stage::Packet => "packet",
        }
    }
}

/// Evidence indices left after a stage ran. For the two clustering axes
/// this is the axis's own canonical group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTrace {
    pub stage: Stage,
    pub candidates: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Winner {
    /// 0-based evidence index
    pub index: usize,
    pub rendition_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyReport {
    pub round_id: String,
    pub winner: Option<Winner>,
    /// Surviving candidate set, ascending
    pub candidates: Vec<usize>,
    pub trace: Vec<StageTrace>,
    /// Present when the classifier stage ran
    pub verdicts: Option<TamperVerdicts>,
    pub evidence_fingerprint: String,
}

impl VerifyReport {
    /// Winning rendition path, empty when there is no winner
    pub fn winning_path(&self) -> &str {
        self.winner
            .as_ref()
            .map(|w| w.rendition_path.as_str())
            .unwrap_or("")
    }

    pub fn has_winner(&self) -> bool {
        self.winner.is_some()
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageTrace> {
        self.trace.iter().find(|t| t.stage == stage)
    }
}

/// The lowest surviving index wins
pub fn select_winner(candidates: &[usize], evidences: &[Evidence]) -> Option<Winner> {
    let index = candidates.iter().copied().min()?;
    evidences.get(index).map(|evidence| Winner {
        index,
        rendition_path: evidence.rendition_path.clone(),
    })
}

/// SHA-256 of the evidence list's JSON form, hex encoded
pub fn evidence_fingerprint(evidences: &[Evidence]) -> Result<String> {
    let canonical = serde_json::to_vec(evidences)
        .map_err(|e| VerifyError::InvalidEvidence(format!("cannot serialize evidence: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{:x}", hasher.finalize()))
}
