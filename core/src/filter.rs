//! Bridge to the filter-expression compiler.
//!
//! Filter expressions select events at capture time (`pid == 1234`). Only
//! their *text* is part of a rule's identity and only the text ever crosses
//! the control channel; the executable form is produced locally by whichever
//! compiler the embedding process provides. A peer that offers bytecode
//! directly is ignored by construction: there is no wire field for it.

use thiserror::Error;

/// Compiled, executable form of a filter expression.
///
/// Opaque to this crate; the capture data plane interprets it. Owned by
/// exactly one rule and never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBytecode {
    bytes: Vec<u8>,
}

impl FilterBytecode {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The compiler rejected a filter expression.
#[derive(Debug, Clone, Error)]
#[error("failed to compile filter `{expression}`: {reason}")]
pub struct CompileError {
    expression: String,
    reason: String,
}

impl CompileError {
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Compiles filter text into executable bytecode.
///
/// Implemented outside this crate (the tracing service and client each carry
/// their own compiler). Invoked only on locally-held text, never on anything
/// a peer supplied as already-compiled.
pub trait FilterCompiler {
    fn compile(&self, expression: &str) -> Result<FilterBytecode, CompileError>;
}

/// A compiled filter together with the exact text it was compiled from.
///
/// Rules cache this next to their `filter_expression`; comparing the snapshot
/// against the current text detects staleness after the expression changes.
#[derive(Debug, Clone)]
pub(crate) struct CompiledFilter {
    pub(crate) source: String,
    pub(crate) bytecode: FilterBytecode,
}
