/// Stable JSON result schema emitted by the `verify` command
use crate::classifier::client::TamperVerdicts;
use crate::config::types::{ErrorSeverity, Result, VerifyError};
use crate::verdict::verdict::{StageTrace, VerifyReport};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    Winner,
    NoWinner,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorReport {
    /// Stable kind name, see `VerifyError::kind`
    pub kind: String,
    pub message: String,
    pub severity: ErrorSeverity,
    pub retryable: bool,
}

impl From<&VerifyError> for ErrorReport {
    fn from(err: &VerifyError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            severity: err.severity(),
            retryable: err.is_retryable(),
        }
    }
}

/// One verification round as seen by callers (v1, frozen field names)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerifyResultV1 {
    pub schema_version: String,
    pub status: VerifyStatus,
    /// Empty when there is no winner
    pub winning_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_index: Option<usize>,
    pub candidates: Vec<usize>,
    #[serde(default)]
    pub trace: Vec<StageTrace>,
    /// Classifier verdicts, indexed like the submitted evidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdicts: Option<TamperVerdicts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_fingerprint: Option<String>,
    pub started_at: String,
    pub finished_at: String,
}

impl VerifyResultV1 {
    pub fn from_report(report: &VerifyReport, started_at: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            status: if report.has_winner() {
                VerifyStatus::Winner
            } else {
                VerifyStatus::NoWinner
            },
            winning_path: report.winning_path().to_string(),
            winner_index: report.winner.as_ref().map(|w| w.index),
            candidates: report.candidates.clone(),
            trace: report.trace.clone(),
            verdicts: report.verdicts.clone(),
            error: None,
            round_id: Some(report.round_id.clone()),
            evidence_fingerprint: Some(report.evidence_fingerprint.clone()),
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn from_error(err: &VerifyError, started_at: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            status: VerifyStatus::Error,
            winning_path: String::new(),
            winner_index: None,
            candidates: Vec::new(),
            trace: Vec::new(),
            verdicts: None,
            error: Some(ErrorReport::from(err)),
            round_id: None,
            evidence_fingerprint: None,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Process exit code: 0 winner, 1 no winner, 75/65 by error severity
    pub fn exit_code(&self) -> i32 {
        match (&self.status, &self.error) {
            (VerifyStatus::Winner, _) => 0,
            (VerifyStatus::NoWinner, _) => 1,
            (VerifyStatus::Error, Some(error)) if error.retryable => 75,
            (VerifyStatus::Error, _) => 65,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VerifyError::Config(format!("Failed to serialize result to JSON: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            VerifyError::Config(format!("Failed to deserialize result from JSON: {}", e))
        })
    }

    pub fn validate_schema_version(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(VerifyError::Config(format!(
                "Unsupported schema version: {}",
                self.schema_version
            )));
        }
        Ok(())
    }
}
