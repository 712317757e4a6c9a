//! Syscall event rules: capture system calls whose name matches a glob.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{validate_filter_expression, validate_pattern};
use super::{MAX_FILTER_EXPRESSION_LEN, MAX_PATTERN_LEN};
use crate::error::Error;
use crate::filter::{CompileError, CompiledFilter, FilterBytecode, FilterCompiler};
use crate::protocol::payload::{PayloadBuilder, PayloadView};
use crate::Result;

/// Where, relative to the traced syscall, an event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum EmissionSite {
    EntryExit = 0,
    Entry = 1,
    Exit = 2,
}

impl EmissionSite {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Maps a wire value into the enumerated domain; anything else is
    /// rejected, never coerced.
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(EmissionSite::EntryExit),
            1 => Ok(EmissionSite::Entry),
            2 => Ok(EmissionSite::Exit),
            other => Err(Error::InvalidEnumValue {
                field: "emission site",
                value: other,
            }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EmissionSite::EntryExit => "entry+exit",
            EmissionSite::Entry => "entry",
            EmissionSite::Exit => "exit",
        }
    }
}

impl fmt::Display for EmissionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Captures syscalls whose name matches `pattern`, optionally narrowed by a
/// filter expression.
///
/// Identity is `emission_site` + `pattern` + `filter_expression`. The
/// compiled form of the filter is cached on the rule but is not identity: it
/// is excluded from equality and serialization, never crosses the wire, and
/// each process derives its own through
/// [`filter_bytecode`](SyscallEventRule::filter_bytecode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyscallEventRule {
    emission_site: EmissionSite,
    pattern: String,
    filter_expression: Option<String>,
    #[serde(skip)]
    compiled: Option<CompiledFilter>,
}

impl SyscallEventRule {
    /// Builds a rule, validating its fields.
    ///
    /// The same validation runs for wire decode, so an empty pattern fails
    /// here before any wire interaction is possible.
    pub fn new(
        emission_site: EmissionSite,
        pattern: impl Into<String>,
        filter_expression: Option<String>,
    ) -> Result<Self> {
        let pattern = pattern.into();
        validate_pattern(&pattern)?;
        if let Some(expression) = &filter_expression {
            validate_filter_expression(expression)?;
        }
        Ok(Self {
            emission_site,
            pattern,
            filter_expression,
            compiled: None,
        })
    }

    pub fn emission_site(&self) -> EmissionSite {
        self.emission_site
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn filter_expression(&self) -> Option<&str> {
        self.filter_expression.as_deref()
    }

    /// Replaces the filter expression and discards the cached bytecode.
    pub fn set_filter_expression(&mut self, expression: Option<String>) -> Result<()> {
        if let Some(expression) = &expression {
            validate_filter_expression(expression)?;
        }
        self.filter_expression = expression;
        self.compiled = None;
        Ok(())
    }

    /// The compiled filter, produced on first access by the local compiler.
    ///
    /// Recompiles when the cached snapshot no longer matches the current
    /// expression text. Returns `None` when the rule has no filter.
    pub fn filter_bytecode(
        &mut self,
        compiler: &dyn FilterCompiler,
    ) -> std::result::Result<Option<&FilterBytecode>, CompileError> {
        let Some(expression) = self.filter_expression.as_deref() else {
            return Ok(None);
        };
        let stale = self
            .compiled
            .as_ref()
            .map_or(true, |cached| cached.source != expression);
        if stale {
            let bytecode = compiler.compile(expression)?;
            self.compiled = Some(CompiledFilter {
                source: expression.to_owned(),
                bytecode,
            });
        }
        Ok(self.compiled.as_ref().map(|cached| &cached.bytecode))
    }

    /// Whether a compiled filter is currently cached.
    pub fn is_filter_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Appends the variant record: `emission_site: u32`, `pattern_len: u32`,
    /// `filter_expression_len: u32` (both terminator-inclusive, 0 = absent
    /// filter), then the terminated strings.
    pub(crate) fn encode_into(&self, payload: &mut PayloadBuilder) {
        let pattern_len = self.pattern.len() + 1;
        let filter_len = self
            .filter_expression
            .as_ref()
            .map_or(0, |expression| expression.len() + 1);
        let start = payload.len();

        payload.write_u32(self.emission_site.as_u32());
        payload.write_u32(pattern_len as u32);
        payload.write_u32(filter_len as u32);
        payload.write_cstring(&self.pattern);
        if let Some(expression) = &self.filter_expression {
            payload.write_cstring(expression);
        }

        // Recorded lengths disagreeing with the appended bytes is an encoder
        // bug, not a recoverable condition.
        assert_eq!(
            payload.len() - start,
            12 + pattern_len + filter_len,
            "syscall rule record length mismatch"
        );
    }

    /// Decodes the variant record. Untrusted input: lengths are
    /// bounds-checked before any allocation, terminators are verified, and
    /// every failure path drops whatever strings were already read.
    pub(crate) fn decode_from(view: &mut PayloadView<'_>) -> Result<Self> {
        let emission_site = EmissionSite::from_u32(view.read_u32()?)?;
        let pattern_len = view.read_u32()? as usize;
        let filter_len = view.read_u32()? as usize;

        if pattern_len == 0 {
            return Err(Error::InvalidEventRule("pattern must not be empty"));
        }
        if pattern_len > MAX_PATTERN_LEN + 1 {
            return Err(Error::InvalidEventRule("pattern too long"));
        }
        if filter_len > MAX_FILTER_EXPRESSION_LEN + 1 {
            return Err(Error::InvalidEventRule("filter expression too long"));
        }

        let pattern = view.read_cstring(pattern_len, "pattern")?;
        let filter_expression = if filter_len > 0 {
            Some(view.read_cstring(filter_len, "filter expression")?)
        } else {
            None
        };

        Self::new(emission_site, pattern, filter_expression)
    }
}

impl PartialEq for SyscallEventRule {
    fn eq(&self, other: &Self) -> bool {
        self.emission_site == other.emission_site
            && self.pattern == other.pattern
            && self.filter_expression == other.filter_expression
    }
}

impl Eq for SyscallEventRule {}
