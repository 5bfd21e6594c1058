/// Core types and structures for the rendverify system
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Encoding profile a rendition was produced with
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VideoProfile {
    /// Profile name as known to the transcoder (e.g. "P720p30fps16x9")
    pub name: String,
    /// Resolution in "WIDTHxHEIGHT" form
    pub resolution: String,
    /// Output framerate (frames per second)
    pub framerate: u32,
}

impl VideoProfile {
    pub fn new(name: &str, resolution: &str, framerate: u32) -> Self {
        Self {
            name: name.to_string(),
            resolution: resolution.to_string(),
            framerate,
        }
    }

    /// Parse the resolution string into (width, height)
    pub fn dimensions(&self) -> std::result::Result<(u32, u32), String> {
        let (w, h) = self
            .resolution
            .split_once('x')
            .ok_or_else(|| format!("resolution '{}' is not WIDTHxHEIGHT", self.resolution))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid width in '{}': {}", self.resolution, e))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid height in '{}': {}", self.resolution, e))?;
        if width == 0 || height == 0 {
            return Err(format!("resolution '{}' has a zero dimension", self.resolution));
        }
        Ok((width, height))
    }

    /// Total pixels per frame (width * height)
    pub fn pixel_count(&self) -> std::result::Result<i64, String> {
        let (w, h) = self.dimensions()?;
        Ok(i64::from(w) * i64::from(h))
    }
}

/// Testable facts about one candidate rendition.
///
/// `positions` and `lengths` are parallel: segment `i` starts at byte
/// `positions[i]` of the rendition file and spans `lengths[i]` bytes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// Source the rendition was transcoded from
    pub source_path: String,
    /// Rendition file produced by the worker
    pub rendition_path: String,
    /// Segment start offsets within the rendition
    pub positions: Vec<u64>,
    /// Segment lengths, same count as `positions`
    pub lengths: Vec<u64>,
    /// Perceptual feature vector
    pub features: Vec<f64>,
    /// Encoding profile
    pub profile: VideoProfile,
}

impl Evidence {
    /// Build evidence, enforcing `positions.len() == lengths.len()`
    pub fn new(
        source_path: impl Into<String>,
        rendition_path: impl Into<String>,
        positions: Vec<u64>,
        lengths: Vec<u64>,
        features: Vec<f64>,
        profile: VideoProfile,
    ) -> Result<Self> {
        if positions.len() != lengths.len() {
            return Err(VerifyError::InvalidEvidence(format!(
                "{} positions but {} lengths",
                positions.len(),
                lengths.len()
            )));
        }
        Ok(Self {
            source_path: source_path.into(),
            rendition_path: rendition_path.into(),
            positions,
            lengths,
            features,
            profile,
        })
    }

    /// Positions reinterpreted as a numeric vector for the position axis
    pub fn position_vector(&self) -> Vec<f64> {
        self.positions.iter().map(|&p| p as f64).collect()
    }

    /// (position, length) segment pairs
    pub fn segments(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.positions.iter().copied().zip(self.lengths.iter().copied())
    }
}

/// Retry classification wrapped around every verification failure
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Re-invoking verification with fresh evidence may succeed
    #[serde(rename = "retryable")]
    Retryable,
    /// The outcome is conclusive; do not retry
    #[serde(rename = "fatal")]
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Retryable => write!(f, "retryable"),
            ErrorSeverity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Errors from the tamper classifier client
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verifier status {status}")]
    VerifierStatus { status: u16 },

    #[error("failed to encode classifier request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode classifier response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid profile for {rendition}: {details}")]
    InvalidProfile { rendition: String, details: String },

    #[error("classifier request has no renditions")]
    EmptyRequest,

    #[error("classifier returned {got} results for {expected} renditions")]
    ResultCountMismatch { expected: usize, got: usize },
}

impl ClassifierError {
    /// Whether the failure looks transient (service unavailable or misbehaving)
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifierError::Transport(_) => true,
            ClassifierError::VerifierStatus { status } => *status >= 500 || *status == 429,
            ClassifierError::Decode(_) => true,
            ClassifierError::ResultCountMismatch { .. } => true,
            ClassifierError::Encode(_)
            | ClassifierError::InvalidProfile { .. }
            | ClassifierError::EmptyRequest => false,
        }
    }
}

/// Verification failure taxonomy
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("missing source: {0}")]
    MissingSource(String),

    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),

    #[error("feature consensus not found")]
    FeatureConsensusNotFound,

    #[error("position consensus not found")]
    PositionConsensusNotFound,

    #[error("inference error: {0}")]
    Inference(#[source] ClassifierError),

    #[error("packet validation failed for all {candidates} candidate(s)")]
    PacketValidationFailed { candidates: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerifyError {
    /// Retry classification for this failure
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VerifyError::FeatureConsensusNotFound | VerifyError::PositionConsensusNotFound => {
                ErrorSeverity::Retryable
            }
            VerifyError::Inference(cause) if cause.is_transient() => ErrorSeverity::Retryable,
            VerifyError::Io(_) => ErrorSeverity::Retryable,
            VerifyError::Inference(_)
            | VerifyError::MissingSource(_)
            | VerifyError::InvalidEvidence(_)
            | VerifyError::PacketValidationFailed { .. }
            | VerifyError::Config(_) => ErrorSeverity::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Retryable
    }

    /// Stable machine-readable kind name
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::MissingSource(_) => "missing_source",
            VerifyError::InvalidEvidence(_) => "invalid_evidence",
            VerifyError::FeatureConsensusNotFound => "feature_consensus_not_found",
            VerifyError::PositionConsensusNotFound => "position_consensus_not_found",
            VerifyError::Inference(ClassifierError::VerifierStatus { .. }) => "verifier_status",
            VerifyError::Inference(_) => "inference_error",
            VerifyError::PacketValidationFailed { .. } => "packet_validation_failed",
            VerifyError::Config(_) => "config",
            VerifyError::Io(_) => "io",
        }
    }
}

/// Convert verification errors to process exit codes
impl From<&VerifyError> for i32 {
    fn from(err: &VerifyError) -> i32 {
        match err.severity() {
            ErrorSeverity::Retryable => 75, // EX_TEMPFAIL
            ErrorSeverity::Fatal => 65,     // EX_DATAERR
        }
    }
}

/// Result type alias for rendverify operations
pub type Result<T> = std::result::Result<T, VerifyError>;
