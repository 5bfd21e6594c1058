/// Verification audit trail
///
/// Structured events for every verification round: which stages ran, what
/// each axis agreed on, which candidates were rejected and why, and how
/// the round ended. Events go to a JSON-lines file when one is configured
/// and to the `log` facade otherwise.
use crate::config::types::{Result, VerifyError};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationEventType {
    VerificationStart,
    ConsensusFound,
    ConsensusMissing,
    InferenceSuccess,
    InferenceFailure,
    CandidateAccepted,
    CandidateRejected,
    WinnerSelected,
    NoWinner,
    VerificationFailed,
}

impl VerificationEventType {
    pub fn default_severity(&self) -> EventSeverity {
        match self {
            VerificationEventType::VerificationStart
            | VerificationEventType::ConsensusFound
            | VerificationEventType::InferenceSuccess
            | VerificationEventType::CandidateAccepted
            | VerificationEventType::WinnerSelected => EventSeverity::Low,

            VerificationEventType::ConsensusMissing
            | VerificationEventType::NoWinner
            | VerificationEventType::InferenceFailure => EventSeverity::Medium,

            // A rejected candidate failed structural checks on its bytes
            VerificationEventType::CandidateRejected
            | VerificationEventType::VerificationFailed => EventSeverity::High,
        }
    }
}

/// Identifiers tying the events of one verification round together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationIds {
    pub round_id: String,
    /// Source path shared by the evidence
    pub source: String,
    /// SHA-256 of the evidence list, once computed
    pub evidence_fingerprint: Option<String>,
}

impl CorrelationIds {
    pub fn new(source: &str) -> Self {
        Self {
            round_id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            evidence_fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.evidence_fingerprint = Some(fingerprint);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationEvent {
    pub event_type: VerificationEventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    pub correlation: Option<CorrelationIds>,
    /// Evidence index the event is about
    pub candidate: Option<usize>,
    pub stage: Option<String>,
    pub error_kind: Option<String>,
}

impl VerificationEvent {
    pub fn new(event_type: VerificationEventType, details: String) -> Self {
        Self {
            event_type,
            severity: event_type.default_severity(),
            timestamp: Utc::now(),
            details,
            correlation: None,
            candidate: None,
            stage: None,
            error_kind: None,
        }
    }

    pub fn with_correlation(mut self, correlation: CorrelationIds) -> Self {
        self.correlation = Some(correlation);
        self
    }

    pub fn with_candidate(mut self, candidate: usize) -> Self {
        self.candidate = Some(candidate);
        self
    }

    pub fn with_stage(mut self, stage: &str) -> Self {
        self.stage = Some(stage.to_string());
        self
    }

    pub fn with_error_kind(mut self, kind: &str) -> Self {
        self.error_kind = Some(kind.to_string());
        self
    }

    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Appends events to a JSON-lines file
pub struct AuditLogger {
    audit_file: Mutex<File>,
    audit_path: PathBuf,
}

impl AuditLogger {
    pub fn new(audit_path: &Path) -> Result<Self> {
        if let Some(parent) = audit_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VerifyError::Config(format!("Failed to create audit log directory: {}", e))
                })?;
            }
        }

        let audit_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(audit_path)
            .map_err(|e| VerifyError::Config(format!("Failed to open audit log: {}", e)))?;

        Ok(Self {
            audit_file: Mutex::new(audit_file),
            audit_path: audit_path.to_path_buf(),
        })
    }

    pub fn log_event(&self, event: &VerificationEvent) {
        log_to_facade(event);

        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        match self.audit_file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", line) {
                    error!("Failed to write to audit log: {}", e);
                }
                if let Err(e) = file.flush() {
                    error!("Failed to flush audit log: {}", e);
                }
            }
            Err(_) => error!("Failed to acquire lock on audit file"),
        }
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }
}

fn log_to_facade(event: &VerificationEvent) {
    let round = event
        .correlation
        .as_ref()
        .map(|c| c.round_id.as_str())
        .unwrap_or("-");
    match event.severity {
        EventSeverity::High => warn!("[{}] {:?}: {}", round, event.event_type, event.details),
        EventSeverity::Medium => info!("[{}] {:?}: {}", round, event.event_type, event.details),
        EventSeverity::Low => {
            log::debug!("[{}] {:?}: {}", round, event.event_type, event.details)
        }
    }
}

static AUDIT_LOGGER: OnceLock<AuditLogger> = OnceLock::new();

/// Install the process-wide audit file. Later calls are ignored.
pub fn init_audit_logger(audit_path: &Path) -> Result<()> {
    let logger = AuditLogger::new(audit_path)?;
    if AUDIT_LOGGER.set(logger).is_err() {
        warn!("Audit logger already initialized");
    } else {
        info!("Audit log at {}", audit_path.display());
    }
    Ok(())
}

pub fn log_verification_event(event: VerificationEvent) {
    match AUDIT_LOGGER.get() {
        Some(logger) => logger.log_event(&event),
        None => log_to_facade(&event),
    }
}

pub fn verification_start(correlation: &CorrelationIds, evidence_count: usize) {
    log_verification_event(
        VerificationEvent::new(
            VerificationEventType::VerificationStart,
            format!("verifying {} rendition(s)", evidence_count),
        )
        .with_correlation(correlation.clone()),
    );
}

pub fn consensus_found(correlation: &CorrelationIds, axis: &str, members: &[usize]) {
    log_verification_event(
        VerificationEvent::new(
            VerificationEventType::ConsensusFound,
            format!("{} axis agreed on evidence {:?}", axis, members),
        )
        .with_correlation(correlation.clone())
        .with_stage(axis),
    );
}

pub fn consensus_missing(correlation: &CorrelationIds, axis: &str) {
    log_verification_event(
        VerificationEvent::new(
            VerificationEventType::ConsensusMissing,
            format!("{} axis produced no cluster", axis),
        )
        .with_correlation(correlation.clone())
        .with_stage(axis),
    );
}

pub fn inference_success(correlation: &CorrelationIds, tampered: usize, total: usize) {
    log_verification_event(
        VerificationEvent::new(
            VerificationEventType::InferenceSuccess,
            format!("classifier flagged {} of {} rendition(s)", tampered, total),
        )
        .with_correlation(correlation.clone())
        .with_stage("inference"),
    );
}

pub fn inference_failure(correlation: &CorrelationIds, error: &str) {
    log_verification_event(
        VerificationEvent::new(VerificationEventType::InferenceFailure, error.to_string())
            .with_correlation(correlation.clone())
            .with_stage("inference"),
    );
}

pub fn candidate_accepted(correlation: &CorrelationIds, candidate: usize, rendition: &str) {
    log_verification_event(
        VerificationEvent::new(
            VerificationEventType::CandidateAccepted,
            format!("{} passed packet validation", rendition),
        )
        .with_correlation(correlation.clone())
        .with_candidate(candidate)
        .with_stage("packet"),
    );
}

pub fn candidate_rejected(correlation: &CorrelationIds, candidate: usize, reason: &str) {
    log_verification_event(
        VerificationEvent::new(VerificationEventType::CandidateRejected, reason.to_string())
            .with_correlation(correlation.clone())
            .with_candidate(candidate)
            .with_stage("packet"),
    );
}

pub fn winner_selected(correlation: &CorrelationIds, candidate: usize, rendition: &str) {
    log_verification_event(
        VerificationEvent::new(
            VerificationEventType::WinnerSelected,
            format!("winner {}", rendition),
        )
        .with_correlation(correlation.clone())
        .with_candidate(candidate),
    );
}

pub fn no_winner(correlation: &CorrelationIds) {
    log_verification_event(
        VerificationEvent::new(
            VerificationEventType::NoWinner,
            "no candidate survived".to_string(),
        )
        .with_correlation(correlation.clone()),
    );
}

pub fn verification_failed(correlation: &CorrelationIds, error: &VerifyError) {
    log_verification_event(
        VerificationEvent::new(VerificationEventType::VerificationFailed, error.to_string())
            .with_correlation(correlation.clone())
            .with_error_kind(error.kind()),
    );
}
