//! Control-plane core for Sonde
//!
//! This crate contains the data model client tools and the tracing service
//! exchange over the control channel — event rules (what to capture) and
//! snapshot outputs (where to flush captured data) — together with their
//! canonical binary encoding and the reliable byte transport underneath.
//!
//! Everything arriving off the wire is untrusted: decoders are
//! bounds-checked and length-verified, enum values outside their domain are
//! rejected, and filter expressions cross the boundary as text only — each
//! process compiles its own bytecode through the [`filter`] bridge, so a
//! peer can never inject an executable filter representation.

pub mod error;
pub mod filter;
pub mod protocol;
pub mod types;

#[cfg(unix)]
pub mod transport;

pub use error::Error;

/// Result type for control-plane operations
pub type Result<T> = std::result::Result<T, Error>;

// Re-export commonly used types
pub use protocol::payload::{PayloadBuilder, PayloadView};
pub use types::{event_rule::*, snapshot::*};
