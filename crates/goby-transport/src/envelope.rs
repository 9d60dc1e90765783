use std::time::Duration;

use goby_address::{Group, Identifier};
use goby_marshal::SchemeId;

/// Per-publication metadata carried alongside a serialised envelope
/// (spec.md §3, "Publisher config (TransporterConfig)"). Consulted by
/// [`goby_buffer::DynamicBuffer`] to create or merge a SubBuffer on demand
/// when the envelope crosses an intervehicle link.
#[derive(Clone, Debug, Default)]
pub struct TransporterConfig {
    pub ttl: Option<Duration>,
    pub value_base: Option<f64>,
    pub max_queue: Option<usize>,
    pub blackout_time: Option<Duration>,
    pub newest_first: Option<bool>,
    pub ack_required: bool,
}

/// The serialised envelope crossing a layer boundary (spec.md §3,
/// "SerializerTransporterMessage"). The `(scheme, type_name, group)` triple
/// forms the forwarding key used by subscription matching.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub identifier: Identifier,
    pub group: Group,
    pub scheme: SchemeId,
    pub type_name: String,
    pub serialize_time: Duration,
    pub config: TransporterConfig,
    pub payload: Vec<u8>,
    /// Modem/vehicle addressing for the intervehicle layer (spec.md §4.8).
    /// `0` means broadcast; layers that don't route by destination (
    /// interthread, interprocess) leave this at its default.
    pub destination: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            identifier: Identifier::parse("/_default/protobuf/_Default/0/0/").expect("static identifier parses"),
            group: Group::new("_default"),
            scheme: goby_marshal::PROTOBUF,
            type_name: String::new(),
            serialize_time: Duration::ZERO,
            config: TransporterConfig::default(),
            payload: Vec::new(),
            destination: 0,
        }
    }
}

impl Envelope {
    /// Identity used for ack/expire callback matching (spec.md §9): keyed
    /// by `(scheme, type, group, serialize_time, payload-hash)` rather than
    /// raw bytes, so a portal rewriting a header field (e.g. zeroing a
    /// source id before re-publishing a subscription record) doesn't break
    /// the match.
    pub fn identity_key(&self) -> EnvelopeIdentity {
        EnvelopeIdentity {
            scheme: self.scheme,
            type_name: self.type_name.clone(),
            group: self.group.to_string(),
            serialize_time: self.serialize_time,
            payload_hash: fnv1a(&self.payload),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnvelopeIdentity {
    pub scheme: SchemeId,
    pub type_name: String,
    pub group: String,
    pub serialize_time: Duration,
    pub payload_hash: u64,
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use goby_marshal::PROTOBUF;

    fn env(payload: &[u8]) -> Envelope {
        Envelope {
            identifier: Identifier::parse("/g/protobuf/T/1/1/").unwrap(),
            group: Group::new("g"),
            scheme: PROTOBUF,
            type_name: "T".into(),
            serialize_time: Duration::from_millis(5),
            config: TransporterConfig::default(),
            payload: payload.to_vec(),
            destination: 0,
        }
    }

    #[test]
    fn identity_key_stable_for_equal_envelopes() {
        assert_eq!(env(b"abc").identity_key(), env(b"abc").identity_key());
    }

    #[test]
    fn identity_key_differs_on_payload() {
        assert_ne!(env(b"abc").identity_key(), env(b"abd").identity_key());
    }
}
