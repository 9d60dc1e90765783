use serde::{Deserialize, Serialize};

use goby_buffer::SubBufferConfig;
use goby_transport::TransporterConfig;

/// Describes one remote vehicle's interest in a `(group, type)` stream,
/// serialized and transmitted over the link so the publishing vehicle can
/// create or merge a sub-buffer dedicated to it (spec.md §4.8,
/// "subscription propagation"). Durations are carried as milliseconds
/// since the wire format has no native duration type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub group: String,
    pub type_name: String,
    pub ttl_ms: u64,
    pub value_base: f64,
    pub max_queue: u32,
    pub blackout_ms: u64,
    pub newest_first: bool,
    pub ack_required: bool,
}

/// The reserved group number propagated subscription records are framed
/// under on the link, distinct from any application data group.
pub const SUBSCRIPTION_GROUP: u32 = 0;

impl SubscriptionRecord {
    pub fn new(group: impl Into<String>, type_name: impl Into<String>, cfg: &TransporterConfig) -> Self {
        Self {
            group: group.into(),
            type_name: type_name.into(),
            ttl_ms: cfg.ttl.unwrap_or(std::time::Duration::from_secs(10)).as_millis() as u64,
            value_base: cfg.value_base.unwrap_or(1.0),
            max_queue: cfg.max_queue.unwrap_or(usize::MAX).min(u32::MAX as usize) as u32,
            blackout_ms: cfg.blackout_time.unwrap_or_default().as_millis() as u64,
            newest_first: cfg.newest_first.unwrap_or(false),
            ack_required: cfg.ack_required,
        }
    }

    pub fn sub_id(&self) -> String {
        format!("{}:{}", self.group, self.type_name)
    }

    pub fn to_sub_buffer_config(&self) -> SubBufferConfig {
        SubBufferConfig::new(std::time::Duration::from_millis(self.ttl_ms), self.value_base)
            .with_max_queue(self.max_queue as usize)
            .with_blackout(std::time::Duration::from_millis(self.blackout_ms))
            .with_newest_first(self.newest_first)
            .with_ack_required(self.ack_required)
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("subscription record always serializes")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_encoding() {
        let cfg = TransporterConfig {
            ttl: Some(std::time::Duration::from_millis(5000)),
            ack_required: true,
            ..Default::default()
        };
        let record = SubscriptionRecord::new("nav", "Position", &cfg);
        let decoded = SubscriptionRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded.group, "nav");
        assert_eq!(decoded.type_name, "Position");
        assert_eq!(decoded.ttl_ms, 5000);
        assert!(decoded.ack_required);
    }

    #[test]
    fn sub_id_combines_group_and_type() {
        let record = SubscriptionRecord::new("nav", "Position", &TransporterConfig::default());
        assert_eq!(record.sub_id(), "nav:Position");
    }
}
