//! Utilities
//!
//! Upstream evidence intake and the JSON result schema.

pub mod delimited;
pub mod json_schema;
pub mod upstream;
