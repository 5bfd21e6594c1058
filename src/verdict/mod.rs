//! Verification verdicts
//!
//! `orchestrator` runs the staged pipeline over an evidence list;
//! `verdict` holds the report it produces.

pub mod orchestrator;
pub mod verdict;

pub use orchestrator::Verifier;
pub use verdict::{Stage, StageTrace, VerifyReport, Winner};
