//! Transport stream packet validation
//!
//! Structural checks on raw rendition bytes that clustering cannot catch.

pub mod validator;

pub use validator::{
    validate_file, validate_stream, PacketFault, StreamValidator, TsPacketValidator,
    ValidationSummary,
};
