/// Comma-delimited numeric lists as written by the transcoding side
///
/// Lists may arrive quoted, bracketed or padded with spaces
/// (`"0, 376.0, 752"`, `[0.1,0.2]`). All of that is stripped before the
/// values are parsed. An empty list is valid.
use crate::config::types::{Result, VerifyError};

fn tokens(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '[' | ']') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Vec::new();
    }
    cleaned.split(',').map(str::to_string).collect()
}

/// Floating-point values, e.g. a feature vector
pub fn parse_floats(raw: &str) -> Result<Vec<f64>> {
    tokens(raw)
        .iter()
        .enumerate()
        .map(|(i, token)| {
            token.parse::<f64>().map_err(|e| {
                VerifyError::InvalidEvidence(format!(
                    "value {} ('{}') is not a number: {}",
                    i, token, e
                ))
            })
        })
        .collect()
}

/// Byte offsets. Float spellings such as `376.0` are truncated.
pub fn parse_positions(raw: &str) -> Result<Vec<u64>> {
    parse_floats(raw)?
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            if !value.is_finite() || value < 0.0 || value > u64::MAX as f64 {
                return Err(VerifyError::InvalidEvidence(format!(
                    "position {} ({}) is not a byte offset",
                    i, value
                )));
            }
            Ok(value.trunc() as u64)
        })
        .collect()
}

/// Byte lengths, integers only
pub fn parse_lengths(raw: &str) -> Result<Vec<u64>> {
    tokens(raw)
        .iter()
        .enumerate()
        .map(|(i, token)| {
            token.parse::<u64>().map_err(|e| {
                VerifyError::InvalidEvidence(format!(
                    "length {} ('{}') is invalid: {}",
                    i, token, e
                ))
            })
        })
        .collect()
}
