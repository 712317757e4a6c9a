//! Error taxonomy for decoding and validating control messages.
//!
//! Everything a remote peer can cause maps to a variant here; none of these
//! abort the process. Transport failures are reported separately through
//! [`Transfer::Failed`](crate::transport::Transfer), which carries the raw
//! `std::io::Error` alongside the byte count already moved.

use thiserror::Error;

use crate::filter::CompileError;

/// Errors produced while decoding, constructing, or validating control-plane
/// types.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload ended before the requested bytes could be read.
    #[error("payload truncated: needed {needed} more bytes, {remaining} remaining")]
    TruncatedPayload { needed: usize, remaining: usize },

    /// A string field's declared length did not end on a NUL terminator.
    #[error("{field} is not NUL-terminated")]
    MissingTerminator { field: &'static str },

    /// A string field's bytes are not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidString { field: &'static str },

    /// A wire value fell outside its enumerated domain.
    #[error("invalid value {value} for {field}")]
    InvalidEnumValue { field: &'static str, value: u32 },

    /// The event-rule envelope carried a discriminant no variant claims.
    #[error("unknown event rule kind {0}")]
    UnknownEventRuleKind(u32),

    /// An event rule failed construction-time validation.
    #[error("invalid event rule: {0}")]
    InvalidEventRule(&'static str),

    /// A snapshot output failed validation.
    #[error("invalid snapshot output: {0}")]
    InvalidSnapshotOutput(&'static str),

    /// The filter compiler rejected a filter expression.
    #[error(transparent)]
    Compile(#[from] CompileError),
}
