//! External tamper classifier
//!
//! `wire` holds the service's JSON contract; `client` builds requests from
//! evidence and folds responses into per-rendition verdicts.

pub mod client;
pub mod wire;

pub use client::{HttpTamperClassifier, TamperClassifier, TamperVerdict, TamperVerdicts};
