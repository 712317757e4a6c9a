//! Snapshot outputs: where an on-demand dump of buffered trace data lands.
//!
//! A descriptor names a flush target — a local path or a network endpoint —
//! plus a size cap. Exactly one destination kind exists per descriptor by
//! construction (sum type), it is validated before it becomes observable,
//! and it is immutable afterwards. `max_size == 0` means unbounded and is a
//! legal wire value, not an "absent" sentinel.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::protocol::payload::{PayloadBuilder, PayloadView};
use crate::Result;

/// Longest accepted snapshot output name, in bytes, terminator excluded.
pub const MAX_SNAPSHOT_NAME_LEN: usize = 255;

/// Longest accepted local destination path, in bytes, terminator excluded.
pub const MAX_PATH_LEN: usize = 4096;

/// Longest accepted network destination host, in bytes, terminator excluded.
pub const MAX_HOST_LEN: usize = 255;

const DESTINATION_TAG_LOCAL: u32 = 0;
const DESTINATION_TAG_NETWORK: u32 = 1;

/// Flush target of a snapshot output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotDestination {
    /// Directory on the machine running the tracing service.
    LocalPath { path: String },
    /// Remote relay endpoint; control and data travel on separate ports.
    Network {
        host: String,
        control_port: u16,
        data_port: u16,
    },
}

impl SnapshotDestination {
    fn kind_tag(&self) -> u32 {
        match self {
            SnapshotDestination::LocalPath { .. } => DESTINATION_TAG_LOCAL,
            SnapshotDestination::Network { .. } => DESTINATION_TAG_NETWORK,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, SnapshotDestination::LocalPath { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, SnapshotDestination::Network { .. })
    }
}

/// Named, validated flush target for on-demand snapshots.
///
/// Equality is deep field comparison; descriptors with different destination
/// kinds are never equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOutput {
    name: String,
    destination: SnapshotDestination,
    max_size: u64,
}

impl SnapshotOutput {
    /// Builds a descriptor, rejecting anything that fails
    /// [`validate`](SnapshotOutput::validate); nothing invalid becomes
    /// observable.
    pub fn new(
        name: impl Into<String>,
        destination: SnapshotDestination,
        max_size: u64,
    ) -> Result<Self> {
        let output = Self {
            name: name.into(),
            destination,
            max_size,
        };
        output.validate()?;
        Ok(output)
    }

    /// Name of the output; empty means the service-assigned default.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn destination(&self) -> &SnapshotDestination {
        &self.destination
    }

    /// Byte cap for a single snapshot; 0 = unbounded.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Checks every field bound. `max_size` is unrestricted (0 is legal).
    pub fn validate(&self) -> Result<()> {
        if self.name.len() > MAX_SNAPSHOT_NAME_LEN {
            return Err(Error::InvalidSnapshotOutput("name too long"));
        }
        if self.name.contains('\0') {
            return Err(Error::InvalidSnapshotOutput("name contains a NUL byte"));
        }
        match &self.destination {
            SnapshotDestination::LocalPath { path } => {
                if path.is_empty() {
                    return Err(Error::InvalidSnapshotOutput("path must not be empty"));
                }
                if path.len() > MAX_PATH_LEN {
                    return Err(Error::InvalidSnapshotOutput("path too long"));
                }
                if path.contains('\0') {
                    return Err(Error::InvalidSnapshotOutput("path contains a NUL byte"));
                }
            }
            SnapshotDestination::Network {
                host,
                control_port,
                data_port,
            } => {
                if host.is_empty() {
                    return Err(Error::InvalidSnapshotOutput("host must not be empty"));
                }
                if host.len() > MAX_HOST_LEN {
                    return Err(Error::InvalidSnapshotOutput("host too long"));
                }
                if host.contains('\0') {
                    return Err(Error::InvalidSnapshotOutput("host contains a NUL byte"));
                }
                if *control_port == 0 {
                    return Err(Error::InvalidSnapshotOutput("control port must be nonzero"));
                }
                if *data_port == 0 {
                    return Err(Error::InvalidSnapshotOutput("data port must be nonzero"));
                }
            }
        }
        Ok(())
    }

    /// Appends the wire record: `name_len: u32` (terminator-inclusive) +
    /// terminated name, destination kind tag, destination fields, then
    /// `max_size: u64`. Ports travel as `u32` for uniform field width.
    pub fn serialize(&self, payload: &mut PayloadBuilder) {
        let name_len = self.name.len() + 1;
        let start = payload.len();

        payload.write_u32(name_len as u32);
        payload.write_cstring(&self.name);
        payload.write_u32(self.destination.kind_tag());
        let destination_len = match &self.destination {
            SnapshotDestination::LocalPath { path } => {
                let path_len = path.len() + 1;
                payload.write_u32(path_len as u32);
                payload.write_cstring(path);
                4 + path_len
            }
            SnapshotDestination::Network {
                host,
                control_port,
                data_port,
            } => {
                let host_len = host.len() + 1;
                payload.write_u32(host_len as u32);
                payload.write_cstring(host);
                payload.write_u32(u32::from(*control_port));
                payload.write_u32(u32::from(*data_port));
                4 + host_len + 8
            }
        };
        payload.write_u64(self.max_size);

        assert_eq!(
            payload.len() - start,
            4 + name_len + 4 + destination_len + 8,
            "snapshot output record length mismatch"
        );
    }

    /// The full serialized record as an owned buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = PayloadBuilder::new();
        self.serialize(&mut payload);
        payload.into_vec()
    }

    /// Inverse of [`serialize`](SnapshotOutput::serialize); returns the
    /// descriptor and the bytes consumed.
    ///
    /// Validates before returning, so a peer cannot hand over a descriptor
    /// this process could not have built locally.
    pub fn create_from_buffer(view: &mut PayloadView<'_>) -> Result<(Self, usize)> {
        let start = view.position();

        let name_len = view.read_u32()? as usize;
        if name_len == 0 || name_len > MAX_SNAPSHOT_NAME_LEN + 1 {
            return Err(Error::InvalidSnapshotOutput("name length out of range"));
        }
        let name = view.read_cstring(name_len, "snapshot name")?;

        let tag = view.read_u32()?;
        let destination = match tag {
            DESTINATION_TAG_LOCAL => {
                let path_len = view.read_u32()? as usize;
                if path_len == 0 || path_len > MAX_PATH_LEN + 1 {
                    return Err(Error::InvalidSnapshotOutput("path length out of range"));
                }
                let path = view.read_cstring(path_len, "snapshot path")?;
                SnapshotDestination::LocalPath { path }
            }
            DESTINATION_TAG_NETWORK => {
                let host_len = view.read_u32()? as usize;
                if host_len == 0 || host_len > MAX_HOST_LEN + 1 {
                    return Err(Error::InvalidSnapshotOutput("host length out of range"));
                }
                let host = view.read_cstring(host_len, "snapshot host")?;
                let control_port = read_port(view, "control port")?;
                let data_port = read_port(view, "data port")?;
                SnapshotDestination::Network {
                    host,
                    control_port,
                    data_port,
                }
            }
            other => {
                debug!(tag = other, "rejecting snapshot output with unknown destination kind");
                return Err(Error::InvalidEnumValue {
                    field: "snapshot destination kind",
                    value: other,
                });
            }
        };
        let max_size = view.read_u64()?;

        let output = Self {
            name,
            destination,
            max_size,
        };
        output.validate()?;
        Ok((output, view.position() - start))
    }

    /// Decodes one descriptor from `bytes`, tolerating trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut view = PayloadView::new(bytes);
        let (output, _consumed) = Self::create_from_buffer(&mut view)?;
        Ok(output)
    }
}

/// Ports are `u32` on the wire; anything outside 1..=65535 never names a
/// valid TCP endpoint.
fn read_port(view: &mut PayloadView<'_>, field: &'static str) -> Result<u16> {
    let raw = view.read_u32()?;
    match u16::try_from(raw) {
        Ok(port) if port != 0 => Ok(port),
        _ => {
            debug!(value = raw, field, "rejecting snapshot output port");
            Err(Error::InvalidSnapshotOutput("port out of range"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn local(path: &str) -> SnapshotDestination {
        SnapshotDestination::LocalPath {
            path: path.to_string(),
        }
    }

    fn network(host: &str, control_port: u16, data_port: u16) -> SnapshotDestination {
        SnapshotDestination::Network {
            host: host.to_string(),
            control_port,
            data_port,
        }
    }

    #[test]
    fn test_default_name_unbounded_size_roundtrips() {
        // Empty name = service default; max_size 0 = unbounded, and it must
        // come back as the value 0, not as some absent state.
        let output = SnapshotOutput::new("", local("/tmp/snap"), 0).unwrap();
        assert!(output.validate().is_ok());

        let bytes = output.to_bytes();
        let mut view = PayloadView::new(&bytes);
        let (decoded, consumed) = SnapshotOutput::create_from_buffer(&mut view).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, output);
        assert_eq!(decoded.name(), "");
        assert_eq!(decoded.max_size(), 0);
    }

    #[test]
    fn test_record_byte_layout() {
        let output = SnapshotOutput::new("hourly", local("/tmp/snap"), 4096).unwrap();
        let bytes = output.to_bytes();

        assert_eq!(&bytes[0..4], &[7, 0, 0, 0]); // name_len, terminator included
        assert_eq!(&bytes[4..11], b"hourly\0");
        assert_eq!(&bytes[11..15], &[0, 0, 0, 0]); // local destination tag
        assert_eq!(&bytes[15..19], &[10, 0, 0, 0]); // path_len
        assert_eq!(&bytes[19..29], b"/tmp/snap\0");
        assert_eq!(&bytes[29..37], &4096u64.to_le_bytes());
        assert_eq!(bytes.len(), 37);
    }

    #[test]
    fn test_network_destination_roundtrips() {
        let output =
            SnapshotOutput::new("relay", network("relay.example.com", 5342, 5343), 1 << 20)
                .unwrap();
        let decoded = SnapshotOutput::from_bytes(&output.to_bytes()).unwrap();
        assert_eq!(decoded, output);
        match decoded.destination() {
            SnapshotDestination::Network {
                host,
                control_port,
                data_port,
            } => {
                assert_eq!(host, "relay.example.com");
                assert_eq!(*control_port, 5342);
                assert_eq!(*data_port, 5343);
            }
            other => panic!("expected network destination, got {:?}", other),
        }
    }

    #[test]
    fn test_destination_kinds_never_equal() {
        let a = SnapshotOutput::new("x", local("/tmp/snap"), 0).unwrap();
        let b = SnapshotOutput::new("x", network("/tmp/snap", 1, 1), 0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_descriptors_rejected_at_construction() {
        assert!(SnapshotOutput::new("x", local(""), 0).is_err());
        assert!(SnapshotOutput::new("x", network("", 1, 1), 0).is_err());
        assert!(SnapshotOutput::new("x", network("host", 0, 1), 0).is_err());
        assert!(SnapshotOutput::new("x", network("host", 1, 0), 0).is_err());
        assert!(SnapshotOutput::new("n".repeat(256), local("/p"), 0).is_err());
    }

    #[test]
    fn test_unknown_destination_tag_rejected() {
        let mut payload = PayloadBuilder::new();
        payload.write_u32(1);
        payload.write_cstring("");
        payload.write_u32(9); // no such destination kind
        payload.write_u64(0);

        let bytes = payload.into_vec();
        let mut view = PayloadView::new(&bytes);
        assert!(matches!(
            SnapshotOutput::create_from_buffer(&mut view),
            Err(Error::InvalidEnumValue {
                field: "snapshot destination kind",
                value: 9,
            })
        ));
    }

    #[test]
    fn test_port_out_of_u16_range_rejected() {
        let mut payload = PayloadBuilder::new();
        payload.write_u32(1);
        payload.write_cstring("");
        payload.write_u32(DESTINATION_TAG_NETWORK);
        payload.write_u32(5); // host_len
        payload.write_cstring("host");
        payload.write_u32(70_000);
        payload.write_u32(5343);
        payload.write_u64(0);

        let bytes = payload.into_vec();
        let mut view = PayloadView::new(&bytes);
        assert!(matches!(
            SnapshotOutput::create_from_buffer(&mut view),
            Err(Error::InvalidSnapshotOutput("port out of range"))
        ));
    }

    #[test]
    fn test_truncated_record_never_yields_descriptor() {
        let bytes = SnapshotOutput::new("x", local("/tmp/snap"), 42)
            .unwrap()
            .to_bytes();
        for cut in 0..bytes.len() {
            match SnapshotOutput::from_bytes(&bytes[..cut]) {
                Err(Error::TruncatedPayload { .. }) => {}
                other => panic!("cut at {}: expected TruncatedPayload, got {:?}", cut, other),
            }
        }
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let output = SnapshotOutput::new("daily", network("relay", 5342, 5343), 0).unwrap();
        let json = serde_json::to_string(&output).unwrap();
        let back: SnapshotOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
    }

    proptest! {
        #[test]
        fn roundtrip_holds_for_any_valid_output(
            name in "[a-z0-9-]{0,32}",
            use_network in proptest::bool::ANY,
            path in "/[a-z0-9/_.-]{1,64}",
            host in "[a-z0-9.-]{1,32}",
            control_port in 1u16..,
            data_port in 1u16..,
            max_size in proptest::num::u64::ANY,
        ) {
            let destination = if use_network {
                SnapshotDestination::Network { host, control_port, data_port }
            } else {
                SnapshotDestination::LocalPath { path }
            };
            let output = SnapshotOutput::new(name, destination, max_size).unwrap();
            let bytes = output.to_bytes();
            let mut view = PayloadView::new(&bytes);
            let (decoded, consumed) = SnapshotOutput::create_from_buffer(&mut view).unwrap();
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(decoded, output);
        }
    }
}
