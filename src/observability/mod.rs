//! Observability
//!
//! Structured verification audit events and metrics.

pub mod audit;
pub mod metrics;
