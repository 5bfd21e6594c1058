/// Tamper classifier client
///
/// Describes every candidate rendition to the external scoring service and
/// turns its per-rendition answers into tamper verdicts.
use crate::classifier::wire::{InferenceRequest, InferenceResponse, RenditionResult};
use crate::config::loader::ClassifierConfig;
use crate::config::types::{ClassifierError, Evidence};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

/// Classifier judgment for one rendition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TamperVerdict {
    /// 1 if tampering was detected, 0 otherwise
    pub tamper: u8,
    pub video_available: bool,
    pub audio_available: bool,
    pub audio_dist: f64,
    pub pixels: i64,
    pub ocsvm_dist: f64,
}

impl TamperVerdict {
    pub fn is_tampered(&self) -> bool {
        self.tamper != 0
    }
}

impl From<&RenditionResult> for TamperVerdict {
    fn from(result: &RenditionResult) -> Self {
        Self {
            tamper: u8::from(result.tamper > 0),
            video_available: result.video_available,
            audio_available: result.audio_available,
            audio_dist: result.audio_dist,
            pixels: result.pixels,
            ocsvm_dist: result.ocsvm_dist,
        }
    }
}

/// Verdicts indexed like the evidence list they were requested for
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TamperVerdicts {
    pub verdicts: Vec<TamperVerdict>,
}

impl TamperVerdicts {
    pub fn new(verdicts: Vec<TamperVerdict>) -> Self {
        Self { verdicts }
    }

    /// Build from bare tamper flags (auxiliary fields zeroed)
    pub fn from_flags(flags: &[u8]) -> Self {
        Self::new(
            flags
                .iter()
                .map(|&tamper| TamperVerdict {
                    tamper: u8::from(tamper > 0),
                    video_available: true,
                    audio_available: false,
                    audio_dist: 0.0,
                    pixels: 0,
                    ocsvm_dist: 0.0,
                })
                .collect(),
        )
    }

    pub fn get(&self, index: usize) -> Option<&TamperVerdict> {
        self.verdicts.get(index)
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Candidates whose verdict is "not tampered", order preserved.
    /// A candidate without a verdict is dropped.
    pub fn retain_untampered(&self, candidates: &[usize]) -> Vec<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&id| matches!(self.get(id), Some(verdict) if !verdict.is_tampered()))
            .collect()
    }
}

/// Source of tamper verdicts for a whole evidence list
pub trait TamperClassifier {
    fn infer(&self, evidences: &[Evidence]) -> Result<TamperVerdicts, ClassifierError>;
}

impl<T: TamperClassifier + ?Sized> TamperClassifier for &T {
    fn infer(&self, evidences: &[Evidence]) -> Result<TamperVerdicts, ClassifierError> {
        (**self).infer(evidences)
    }
}

/// Classifier reached over HTTP with a JSON POST
pub struct HttpTamperClassifier {
    client: HttpClient,
    endpoint: String,
    orchestrator_id: String,
}

impl HttpTamperClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = HttpClient::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            orchestrator_id: config.orchestrator_id.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TamperClassifier for HttpTamperClassifier {
    fn infer(&self, evidences: &[Evidence]) -> Result<TamperVerdicts, ClassifierError> {
        let request = InferenceRequest::from_evidence(evidences, &self.orchestrator_id)?;
        let body = serde_json::to_vec(&request).map_err(ClassifierError::Encode)?;

        log::debug!(
            "posting {} rendition(s) to classifier at {}",
            request.renditions.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(ClassifierError::VerifierStatus {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes()?;
        let decoded: InferenceResponse =
            serde_json::from_slice(&bytes).map_err(ClassifierError::Decode)?;

        if decoded.results.len() < evidences.len() {
            return Err(ClassifierError::ResultCountMismatch {
                expected: evidences.len(),
                got: decoded.results.len(),
            });
        }
        if decoded.results.len() > evidences.len() {
            log::warn!(
                "classifier returned {} results for {} renditions, ignoring the extra",
                decoded.results.len(),
                evidences.len()
            );
        }

        Ok(TamperVerdicts::new(
            decoded
                .results
                .iter()
                .take(evidences.len())
                .map(TamperVerdict::from)
                .collect(),
        ))
    }
}
