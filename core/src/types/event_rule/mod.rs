//! Event rule model: what the tracing service should capture.
//!
//! Rules form a closed tagged-variant set. Each variant carries a stable
//! numeric kind tag that leads its wire record, so a decoder always knows
//! which record layout follows — and rejects outright any tag it does not
//! recognize, since record lengths are variant-defined and an unknown body
//! cannot be skipped.
//!
//! Equality is variant-aware: two rules are equal iff they have the same
//! kind and identical identity fields. Cached state (compiled filter
//! bytecode) is excluded from equality, serialization, and the wire.

pub mod syscall;
pub mod tracepoint;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

pub use syscall::{EmissionSite, SyscallEventRule};
pub use tracepoint::{TracepointDomain, TracepointEventRule};

/// Longest accepted event name pattern, in bytes, terminator excluded.
pub const MAX_PATTERN_LEN: usize = 255;

/// Longest accepted filter expression, in bytes, terminator excluded.
pub const MAX_FILTER_EXPRESSION_LEN: usize = 65535;

/// Stable wire discriminants for the closed rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum EventRuleKind {
    Tracepoint = 0,
    Syscall = 1,
}

impl EventRuleKind {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Maps a wire discriminant back into the closed set.
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(EventRuleKind::Tracepoint),
            1 => Ok(EventRuleKind::Syscall),
            other => Err(Error::UnknownEventRuleKind(other)),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EventRuleKind::Tracepoint => "tracepoint",
            EventRuleKind::Syscall => "syscall",
        }
    }
}

impl fmt::Display for EventRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A capture condition for the tracing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventRule {
    Tracepoint(TracepointEventRule),
    Syscall(SyscallEventRule),
}

impl EventRule {
    pub fn kind(&self) -> EventRuleKind {
        match self {
            EventRule::Tracepoint(_) => EventRuleKind::Tracepoint,
            EventRule::Syscall(_) => EventRuleKind::Syscall,
        }
    }

    /// The event name glob of any rule kind.
    pub fn pattern(&self) -> &str {
        match self {
            EventRule::Tracepoint(rule) => rule.pattern(),
            EventRule::Syscall(rule) => rule.pattern(),
        }
    }

    /// The filter expression text of any rule kind, when one is set.
    pub fn filter_expression(&self) -> Option<&str> {
        match self {
            EventRule::Tracepoint(rule) => rule.filter_expression(),
            EventRule::Syscall(rule) => rule.filter_expression(),
        }
    }
}

impl From<SyscallEventRule> for EventRule {
    fn from(rule: SyscallEventRule) -> Self {
        EventRule::Syscall(rule)
    }
}

impl From<TracepointEventRule> for EventRule {
    fn from(rule: TracepointEventRule) -> Self {
        EventRule::Tracepoint(rule)
    }
}

/// Pattern validation shared by local construction and wire decode.
pub(crate) fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(Error::InvalidEventRule("pattern must not be empty"));
    }
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(Error::InvalidEventRule("pattern too long"));
    }
    if pattern.contains('\0') {
        return Err(Error::InvalidEventRule("pattern contains a NUL byte"));
    }
    Ok(())
}

/// Filter expression validation shared by local construction and wire decode.
///
/// Absence is `None`; an empty expression has no meaning and is rejected so
/// the wire keeps a single representation for "no filter".
pub(crate) fn validate_filter_expression(expression: &str) -> Result<()> {
    if expression.is_empty() {
        return Err(Error::InvalidEventRule(
            "filter expression must not be empty; omit it instead",
        ));
    }
    if expression.len() > MAX_FILTER_EXPRESSION_LEN {
        return Err(Error::InvalidEventRule("filter expression too long"));
    }
    if expression.contains('\0') {
        return Err(Error::InvalidEventRule(
            "filter expression contains a NUL byte",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(EventRuleKind::Tracepoint.as_u32(), 0);
        assert_eq!(EventRuleKind::Syscall.as_u32(), 1);
        assert_eq!(
            EventRuleKind::from_u32(1).unwrap(),
            EventRuleKind::Syscall
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        match EventRuleKind::from_u32(7) {
            Err(Error::UnknownEventRuleKind(7)) => {}
            other => panic!("expected UnknownEventRuleKind, got {:?}", other),
        }
    }

    #[test]
    fn test_rules_of_different_kinds_are_never_equal() {
        let syscall: EventRule = SyscallEventRule::new(EmissionSite::Entry, "open*", None)
            .unwrap()
            .into();
        let tracepoint: EventRule =
            TracepointEventRule::new(TracepointDomain::Kernel, "open*", None)
                .unwrap()
                .into();
        assert_ne!(syscall, tracepoint);
    }

    #[test]
    fn test_pattern_dispatch() {
        let rule: EventRule = SyscallEventRule::new(EmissionSite::Exit, "read", None)
            .unwrap()
            .into();
        assert_eq!(rule.kind(), EventRuleKind::Syscall);
        assert_eq!(rule.pattern(), "read");
        assert_eq!(rule.filter_expression(), None);
    }
}
