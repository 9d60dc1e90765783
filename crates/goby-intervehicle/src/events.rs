use goby_transport::EnvelopeIdentity;

/// Why a queued envelope was dropped instead of transmitted (spec.md
/// §4.8). Mirrors the original implementation's `DynamicBuffer::Value`
/// expiration codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpireReason {
    ExpiredTtl,
    ExpiredNoSubscribers,
    ExpiredBufferOverflow,
}

/// Fired when the remote end acknowledges receipt of an ack-required
/// envelope (spec.md §4.8, §9 identity matching).
#[derive(Clone, Debug)]
pub struct AckData {
    pub identity: EnvelopeIdentity,
    pub destination: u32,
}

/// Fired when a queued envelope is dropped without ever transmitting, or
/// without ever being acknowledged.
#[derive(Clone, Debug)]
pub struct ExpireData {
    pub identity: EnvelopeIdentity,
    pub destination: u32,
    pub reason: ExpireReason,
}

pub const ACK_GROUP: &str = "__goby_intervehicle_ack";
pub const EXPIRE_GROUP: &str = "__goby_intervehicle_expire";
