/// Evidence as handed over by the transcoding side
///
/// One batch describes every rendition of a single source. Lists may be
/// JSON arrays or comma-delimited strings; profiles are referenced by name
/// and resolved through the [`ProfileRegistry`].
use crate::config::presets::ProfileRegistry;
use crate::config::types::{Evidence, Result, VerifyError};
use crate::utils::delimited::{parse_floats, parse_lengths, parse_positions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ListField {
    Delimited(String),
    Numbers(Vec<f64>),
}

impl Default for ListField {
    fn default() -> Self {
        ListField::Numbers(Vec::new())
    }
}

impl ListField {
    fn floats(&self) -> Result<Vec<f64>> {
        match self {
            ListField::Delimited(raw) => parse_floats(raw),
            ListField::Numbers(values) => Ok(values.clone()),
        }
    }

    fn positions(&self) -> Result<Vec<u64>> {
        match self {
            ListField::Delimited(raw) => parse_positions(raw),
            ListField::Numbers(values) => values
                .iter()
                .map(|&v| {
                    if v.is_finite() && v >= 0.0 {
                        Ok(v.trunc() as u64)
                    } else {
                        Err(VerifyError::InvalidEvidence(format!(
                            "position {} is not a byte offset",
                            v
                        )))
                    }
                })
                .collect(),
        }
    }

    fn lengths(&self) -> Result<Vec<u64>> {
        match self {
            ListField::Delimited(raw) => parse_lengths(raw),
            ListField::Numbers(values) => values
                .iter()
                .map(|&v| {
                    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                        Ok(v as u64)
                    } else {
                        Err(VerifyError::InvalidEvidence(format!("length {} is invalid", v)))
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRecord {
    /// Rendition file, relative paths resolve against the batch's directory
    pub path: String,
    #[serde(default)]
    pub positions: ListField,
    #[serde(default)]
    pub lengths: ListField,
    #[serde(default)]
    pub features: ListField,
    /// Profile name, e.g. "P720p30fps16x9"
    pub profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceBatch {
    pub source: String,
    #[serde(default)]
    pub rendition_dir: Option<PathBuf>,
    pub renditions: Vec<EvidenceRecord>,
}

impl EvidenceBatch {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| VerifyError::InvalidEvidence(format!("cannot parse evidence file: {}", e)))
    }

    /// Load a batch; relative `rendition_dir` and rendition paths resolve
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut batch = Self::from_json(&content)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        batch.rendition_dir = Some(match batch.rendition_dir.take() {
            Some(dir) if dir.is_relative() => base.join(dir),
            Some(dir) => dir,
            None => base,
        });
        Ok(batch)
    }

    /// Convert every record, in order
    pub fn into_evidence(&self, profiles: &ProfileRegistry) -> Result<Vec<Evidence>> {
        self.renditions
            .iter()
            .enumerate()
            .map(|(i, record)| {
                self.record_to_evidence(record, profiles).map_err(|e| match e {
                    VerifyError::InvalidEvidence(msg) => {
                        VerifyError::InvalidEvidence(format!("rendition {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect()
    }

    fn record_to_evidence(
        &self,
        record: &EvidenceRecord,
        profiles: &ProfileRegistry,
    ) -> Result<Evidence> {
        let rendition = Path::new(&record.path);
        let rendition_path = match &self.rendition_dir {
            Some(dir) if rendition.is_relative() && !dir.as_os_str().is_empty() => {
                dir.join(rendition).to_string_lossy().to_string()
            }
            _ => record.path.clone(),
        };

        Evidence::new(
            self.source.clone(),
            rendition_path,
            record.positions.positions()?,
            record.lengths.lengths()?,
            record.features.floats()?,
            profiles.resolve(&record.profile)?,
        )
    }
}
