// Config and evidence validation
// Config is validated once at startup and fails fast with actionable errors.
// Evidence is validated at the start of every verification round.

use crate::config::loader::{AxisParams, VerifierConfig};
use crate::config::types::{Evidence, Result, VerifyError};

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Validate config at startup. Any error is fatal; warnings are returned.
pub fn validate_config(config: &VerifierConfig) -> Result<ValidationResult> {
    let mut result = ValidationResult::new();

    validate_axis("feature_axis", &config.feature_axis, &mut result);
    validate_axis("position_axis", &config.position_axis, &mut result);
    validate_classifier(config, &mut result);

    let stages = &config.stages;
    if !stages.feature_check
        && !stages.position_check
        && !stages.inference_check
        && !stages.packet_check
    {
        result.add_warning(
            "all stages disabled: the first rendition always wins unchecked".to_string(),
        );
    }

    if !result.is_valid() {
        let error_msg = format!("Config validation failed:\n{}", result.errors.join("\n"));
        return Err(VerifyError::Config(error_msg));
    }

    for warning in &result.warnings {
        log::warn!("config: {}", warning);
    }

    Ok(result)
}

fn validate_axis(name: &str, axis: &AxisParams, result: &mut ValidationResult) {
    if !axis.epsilon.is_finite() || axis.epsilon <= 0.0 {
        result.add_error(format!(
            "{}.epsilon must be a positive finite number, got {}",
            name, axis.epsilon
        ));
    }

    if axis.min_points == 0 {
        result.add_error(format!("{}.min_points cannot be zero", name));
    } else if axis.min_points == 1 {
        result.add_warning(format!(
            "{}.min_points is 1: every rendition forms its own consensus",
            name
        ));
    }
}

fn validate_classifier(config: &VerifierConfig, result: &mut ValidationResult) {
    let classifier = &config.classifier;

    if classifier.timeout_secs == 0 {
        result.add_error("classifier.timeout_secs cannot be zero".to_string());
    }

    if !config.stages.inference_check {
        return;
    }

    let endpoint = classifier.endpoint.trim();
    if endpoint.is_empty() {
        result.add_error(
            "classifier.endpoint must be set when inference_check is enabled".to_string(),
        );
    } else if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        result.add_error(format!(
            "classifier.endpoint must be an http(s) URL: {}",
            endpoint
        ));
    }

    if classifier.orchestrator_id.trim().is_empty() {
        result.add_warning("classifier.orchestrator_id is empty".to_string());
    }
}

/// Validate one verification round's evidence set
pub fn validate_evidence(evidences: &[Evidence]) -> Result<()> {
    let first = evidences
        .first()
        .ok_or_else(|| VerifyError::MissingSource("no evidence supplied".to_string()))?;

    if first.source_path.trim().is_empty() {
        return Err(VerifyError::MissingSource(
            "evidence has an empty source path".to_string(),
        ));
    }

    for (index, evidence) in evidences.iter().enumerate() {
        if evidence.rendition_path.trim().is_empty() {
            return Err(VerifyError::InvalidEvidence(format!(
                "evidence {} has an empty rendition path",
                index
            )));
        }

        if evidence.positions.len() != evidence.lengths.len() {
            return Err(VerifyError::InvalidEvidence(format!(
                "evidence {} has {} positions but {} lengths",
                index,
                evidence.positions.len(),
                evidence.lengths.len()
            )));
        }

        if evidence.source_path != first.source_path {
            log::warn!(
                "evidence {} names source {} but round source is {}",
                index,
                evidence.source_path,
                first.source_path
            );
        }
    }

    Ok(())
}
