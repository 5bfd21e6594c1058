/// Configuration loading from rendverify.json
use crate::config::types::{Result, VerifyError};
use crate::consensus::point::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default classifier endpoint (local verifier service)
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str = "http://127.0.0.1:5000/verify";

/// Which pipeline stages run during verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageFlags {
    /// Cluster feature vectors (cosine)
    pub feature_check: bool,
    /// Cluster segment positions (squared Euclidean)
    pub position_check: bool,
    /// Consult the external tamper classifier
    pub inference_check: bool,
    /// Structurally validate transport packets
    pub packet_check: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            feature_check: true,
            position_check: true,
            inference_check: false, // needs a running classifier service
            packet_check: true,
        }
    }
}

/// Clustering parameters for one consensus axis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisParams {
    pub metric: DistanceMetric,
    /// Neighborhood radius
    pub epsilon: f64,
    /// Minimum cluster size
    pub min_points: usize,
}

impl AxisParams {
    pub fn feature_default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            epsilon: 0.00001,
            min_points: 2,
        }
    }

    pub fn position_default() -> Self {
        Self {
            metric: DistanceMetric::SquaredEuclidean,
            epsilon: 0.0015,
            min_points: 2,
        }
    }
}

/// Tamper classifier client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Full URL the inference request is POSTed to
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Identifier of the orchestrator submitting requests
    pub orchestrator_id: String,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            timeout_secs: 30,
            orchestrator_id: "rendverify".to_string(),
        }
    }
}

/// Full rendverify.json structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerifierConfig {
    pub stages: StageFlags,
    pub feature_axis: AxisParams,
    pub position_axis: AxisParams,
    pub classifier: ClassifierConfig,
    /// JSON-lines audit trail (optional)
    pub audit_log: Option<PathBuf>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            stages: StageFlags::default(),
            feature_axis: AxisParams::feature_default(),
            position_axis: AxisParams::position_default(),
            classifier: ClassifierConfig::default(),
            audit_log: None,
        }
    }
}

impl VerifierConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_content = std::fs::read_to_string(path)
            .map_err(|e| VerifyError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_json(&config_content)
    }

    /// Parse configuration from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| VerifyError::Config(format!("Failed to parse config JSON: {}", e)))
    }

    /// Load ./rendverify.json, or defaults when it does not exist
    pub fn load_default() -> Result<Self> {
        let config_path = std::env::current_dir()
            .map_err(|e| VerifyError::Config(format!("Failed to get current directory: {}", e)))?
            .join("rendverify.json");

        if !config_path.exists() {
            log::debug!("rendverify.json not found, using built-in defaults");
            return Ok(Self::default());
        }

        Self::load_from_file(config_path)
    }
}
