//! rendverify: consensus verification of untrusted video renditions
//!
//! Several workers transcode the same source. Each rendition arrives with
//! evidence (a perceptual feature vector, segment byte positions and
//! lengths, an encoding profile) and this crate decides which rendition,
//! if any, can be trusted.
//!
//! # Architecture
//!
//! ## Consensus ([`consensus`])
//! - [`consensus::point`]: Indexed points and distance metrics
//! - [`consensus::dbscan`]: Deterministic density clustering
//! - [`consensus::intersect`]: Cross-axis candidate intersection
//!
//! ## Packet Validation ([`packet`])
//! - [`packet::validator`]: MPEG-2 transport stream structure checks
//!
//! ## Tamper Classifier ([`classifier`])
//! - [`classifier::wire`]: Service JSON contract
//! - [`classifier::client`]: HTTP client and verdict folding
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::orchestrator`]: Staged verification pipeline
//! - [`verdict::verdict`]: Verification report and evidence fingerprint
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: Structured audit events
//! - [`observability::metrics`]: Prometheus metrics export
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Evidence, profiles and the error taxonomy
//! - [`config::presets`]: Encoding profile registry
//! - [`config::loader`]: `rendverify.json` loading
//! - [`config::validator`]: Config and evidence validation
//!
//! ## Utilities ([`utils`])
//! - [`utils::delimited`]: Comma-delimited list parsing
//! - [`utils::upstream`]: Upstream evidence batches
//! - [`utils::json_schema`]: Stable JSON result schema
//!
//! # Pipeline
//!
//! 1. **Feature axis**: cosine clustering of feature vectors
//! 2. **Position axis**: squared-Euclidean clustering of segment positions
//! 3. **Intersect**: evidence both axes agree on
//! 4. **Inference**: drop renditions the classifier flags as tampered
//! 5. **Packet check**: first candidate whose bytes are structurally sound
//! 6. **Winner**: lowest surviving index

// Configuration & Types
pub mod config;

// Consensus clustering
pub mod consensus;

// Transport stream validation
pub mod packet;

// External tamper classifier
pub mod classifier;

// Verification pipeline
pub mod verdict;

// Observability
pub mod observability;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the rendverify binary.
pub mod cli;

pub use config::types::*;
pub use verdict::orchestrator::Verifier;
pub use verdict::verdict::VerifyReport;
