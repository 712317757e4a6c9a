//! Tracepoint event rules: capture instrumentation points in a domain.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{validate_filter_expression, validate_pattern};
use super::{MAX_FILTER_EXPRESSION_LEN, MAX_PATTERN_LEN};
use crate::error::Error;
use crate::filter::{CompileError, CompiledFilter, FilterBytecode, FilterCompiler};
use crate::protocol::payload::{PayloadBuilder, PayloadView};
use crate::Result;

/// Which instrumentation domain the pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum TracepointDomain {
    Kernel = 1,
    User = 2,
}

impl TracepointDomain {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            1 => Ok(TracepointDomain::Kernel),
            2 => Ok(TracepointDomain::User),
            other => Err(Error::InvalidEnumValue {
                field: "tracepoint domain",
                value: other,
            }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TracepointDomain::Kernel => "kernel",
            TracepointDomain::User => "user",
        }
    }
}

impl fmt::Display for TracepointDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Captures tracepoints whose name matches `pattern` within a domain.
///
/// Same identity, validation, and filter-caching discipline as the syscall
/// variant; the wire record swaps the emission site for the domain tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracepointEventRule {
    domain: TracepointDomain,
    pattern: String,
    filter_expression: Option<String>,
    #[serde(skip)]
    compiled: Option<CompiledFilter>,
}

impl TracepointEventRule {
    pub fn new(
        domain: TracepointDomain,
        pattern: impl Into<String>,
        filter_expression: Option<String>,
    ) -> Result<Self> {
        let pattern = pattern.into();
        validate_pattern(&pattern)?;
        if let Some(expression) = &filter_expression {
            validate_filter_expression(expression)?;
        }
        Ok(Self {
            domain,
            pattern,
            filter_expression,
            compiled: None,
        })
    }

    pub fn domain(&self) -> TracepointDomain {
        self.domain
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

    pub fn is_filter_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    pub(crate) fn encode_into(&self, payload: &mut PayloadBuilder) {
        let pattern_len = self.pattern.len() + 1;
        let filter_len = self
            .filter_expression
            .as_ref()
            .map_or(0, |expression| expression.len() + 1);
        let start = payload.len();

        payload.write_u32(self.domain.as_u32());
        payload.write_u32(pattern_len as u32);
        payload.write_u32(filter_len as u32);
        payload.write_cstring(&self.pattern);
        if let Some(expression) = &self.filter_expression {
            payload.write_cstring(expression);
        }

        assert_eq!(
            payload.len() - start,
            12 + pattern_len + filter_len,
            "tracepoint rule record length mismatch"
        );
    }

    pub(crate) fn decode_from(view: &mut PayloadView<'_>) -> Result<Self> {
        let domain = TracepointDomain::from_u32(view.read_u32()?)?;
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

        Self::new(domain, pattern, filter_expression)
    }
}

impl PartialEq for TracepointEventRule {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.pattern == other.pattern
            && self.filter_expression == other.filter_expression
    }
}

impl Eq for TracepointEventRule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let rule = TracepointEventRule::new(
            TracepointDomain::User,
            "app:request_*",
            Some("latency > 10".to_string()),
        )
        .unwrap();

        let mut payload = PayloadBuilder::new();
        rule.encode_into(&mut payload);
        let bytes = payload.into_vec();

        let mut view = PayloadView::new(&bytes);
        let decoded = TracepointEventRule::decode_from(&mut view).unwrap();
        assert_eq!(view.remaining(), 0);
        assert_eq!(decoded, rule);
        assert!(!decoded.is_filter_compiled());
    }

    #[test]
    fn test_out_of_domain_value_rejected() {
        let mut payload = PayloadBuilder::new();
        payload.write_u32(0); // below the recognized domain tags
        payload.write_u32(2);
        payload.write_u32(0);
        payload.write_cstring("x");

        let bytes = payload.into_vec();
        let mut view = PayloadView::new(&bytes);
        assert!(matches!(
            TracepointEventRule::decode_from(&mut view),
            Err(Error::InvalidEnumValue {
                field: "tracepoint domain",
                value: 0,
            })
        ));
    }

    #[test]
    fn test_empty_pattern_fails_construction() {
        assert!(TracepointEventRule::new(TracepointDomain::Kernel, "", None).is_err());
    }
}
