/// JSON contract of the tamper classifier service
use crate::config::types::{ClassifierError, Evidence};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// One rendition as described to the classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenditionRequest {
    pub uri: String,
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub pixels: i64,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceRequest {
    pub source: String,
    #[serde(rename = "orchestratorID")]
    pub orchestrator_id: String,
    pub renditions: Vec<RenditionRequest>,
}

impl InferenceRequest {
    /// Describe every evidence, in order. The source is taken from the
    /// first evidence.
    pub fn from_evidence(
        evidences: &[Evidence],
        orchestrator_id: &str,
    ) -> Result<Self, ClassifierError> {
        let first = evidences.first().ok_or(ClassifierError::EmptyRequest)?;

        let renditions = evidences
            .iter()
            .map(|evidence| {
                let (width, height) = evidence.profile.dimensions().map_err(|details| {
                    ClassifierError::InvalidProfile {
                        rendition: evidence.rendition_path.clone(),
                        details,
                    }
                })?;
                Ok(RenditionRequest {
                    uri: evidence.rendition_path.clone(),
                    resolution: Resolution { width, height },
                    frame_rate: evidence.profile.framerate,
                    pixels: i64::from(width) * i64::from(height),
                    features: evidence.features.clone(),
                })
            })
            .collect::<Result<Vec<_>, ClassifierError>>()?;

        Ok(Self {
            source: first.source_path.clone(),
            orchestrator_id: orchestrator_id.to_string(),
            renditions,
        })
    }
}

/// Per-rendition result fields returned by the service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenditionResult {
    #[serde(default)]
    pub video_available: bool,
    #[serde(default)]
    pub audio_available: bool,
    #[serde(default)]
    pub audio_dist: f64,
    #[serde(default)]
    pub pixels: i64,
    /// Nonzero when the model detects tampering
    pub tamper: i64,
    /// Anomaly score, orders multiple tamper-flagged results
    #[serde(default)]
    pub ocsvm_dist: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceResponse {
    #[serde(default)]
    pub source: String,
    pub results: Vec<RenditionResult>,
}
