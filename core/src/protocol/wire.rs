//! Discriminant-first wire codec for event rules.
//!
//! Every event rule travels as `kind: u32` followed by the variant record.
//! The decoder reads the discriminant first and dispatches to the matching
//! variant decoder; an unrecognized discriminant rejects the whole message —
//! record layouts are variant-defined, so there is no safe way to skip an
//! unknown body. The snapshot output codec applies the same rule to its
//! destination kind tag (see [`crate::types::snapshot`]).

use tracing::debug;

use crate::protocol::payload::{PayloadBuilder, PayloadView};
use crate::types::event_rule::{EventRule, EventRuleKind, SyscallEventRule, TracepointEventRule};
use crate::Result;

/// Appends a rule's envelope: the kind discriminant, then the variant record.
pub fn encode_event_rule(rule: &EventRule, payload: &mut PayloadBuilder) {
    payload.write_u32(rule.kind().as_u32());
    match rule {
        EventRule::Tracepoint(rule) => rule.encode_into(payload),
        EventRule::Syscall(rule) => rule.encode_into(payload),
    }
}

/// The full encoded envelope as an owned buffer.
pub fn event_rule_to_bytes(rule: &EventRule) -> Vec<u8> {
    let mut payload = PayloadBuilder::new();
    encode_event_rule(rule, &mut payload);
    payload.into_vec()
}

/// Decodes one rule envelope; returns the rule and the bytes consumed.
pub fn decode_event_rule(view: &mut PayloadView<'_>) -> Result<(EventRule, usize)> {
    let start = view.position();
    let raw_kind = view.read_u32()?;
    let kind = EventRuleKind::from_u32(raw_kind).map_err(|err| {
        debug!(kind = raw_kind, "rejecting event rule with unknown kind");
        err
    })?;
    let rule = match kind {
        EventRuleKind::Tracepoint => {
            EventRule::Tracepoint(TracepointEventRule::decode_from(view)?)
        }
        EventRuleKind::Syscall => EventRule::Syscall(SyscallEventRule::decode_from(view)?),
    };
    Ok((rule, view.position() - start))
}

/// Decodes one rule from `bytes`, tolerating trailing data.
pub fn event_rule_from_bytes(bytes: &[u8]) -> Result<EventRule> {
    let mut view = PayloadView::new(bytes);
    let (rule, _consumed) = decode_event_rule(&mut view)?;
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::event_rule::{EmissionSite, TracepointDomain};

    #[test]
    fn test_envelope_leads_with_kind() {
        let rule: EventRule = SyscallEventRule::new(EmissionSite::Entry, "open*", None)
            .unwrap()
            .into();
        let bytes = event_rule_to_bytes(&rule);
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_roundtrip_both_kinds() {
        let rules: Vec<EventRule> = vec![
            SyscallEventRule::new(
                EmissionSite::EntryExit,
                "open*",
                Some("pid == 1234".to_string()),
            )
            .unwrap()
            .into(),
            TracepointEventRule::new(TracepointDomain::Kernel, "sched_switch", None)
                .unwrap()
                .into(),
        ];

        for rule in rules {
            let bytes = event_rule_to_bytes(&rule);
            let mut view = PayloadView::new(&bytes);
            let (decoded, consumed) = decode_event_rule(&mut view).unwrap();
            assert_eq!(consumed, bytes.len());
            assert_eq!(decoded, rule);
        }
    }

    #[test]
    fn test_unknown_kind_rejects_whole_message() {
        let mut payload = PayloadBuilder::new();
        payload.write_u32(42);
        // A plausible-looking body must not rescue the message.
        payload.write_u32(EmissionSite::Entry.as_u32());
        payload.write_u32(2);
        payload.write_u32(0);
        payload.write_cstring("x");

        let bytes = payload.into_vec();
        match event_rule_from_bytes(&bytes) {
            Err(Error::UnknownEventRuleKind(42)) => {}
            other => panic!("expected UnknownEventRuleKind, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_bytes_tolerated_and_counted() {
        let rule: EventRule = SyscallEventRule::new(EmissionSite::Exit, "close", None)
            .unwrap()
            .into();
        let mut bytes = event_rule_to_bytes(&rule);
        let record_len = bytes.len();
        bytes.extend_from_slice(&[0xAA; 16]);

        let mut view = PayloadView::new(&bytes);
        let (decoded, consumed) = decode_event_rule(&mut view).unwrap();
        assert_eq!(decoded, rule);
        assert_eq!(consumed, record_len);
        assert_eq!(view.remaining(), 16);
    }
}
