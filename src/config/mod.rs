//! Configuration and evidence types
//!
//! Shared types, profile presets, config loading and validation.

pub mod loader;
pub mod presets;
pub mod types;
pub mod validator;
