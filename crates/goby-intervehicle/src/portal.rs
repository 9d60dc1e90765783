use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use goby_address::{Group, Identifier};
use goby_buffer::{DynamicBuffer, Instant, SubBufferConfig};
use goby_transport::{Envelope, EnvelopeIdentity, InterThread, PortalBase};

use crate::driver::ModemDriver;
use crate::events::{AckData, ExpireData, ExpireReason, ACK_GROUP, EXPIRE_GROUP};
use crate::subscription::SubscriptionRecord;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct WireDataFrame {
    group: String,
    scheme_id: i32,
    scheme_name: String,
    type_name: String,
    serialize_time_ms: u64,
    ack_required: bool,
    payload: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct WireAckFrame {
    group: String,
    scheme_id: i32,
    scheme_name: String,
    type_name: String,
    serialize_time_ms: u64,
    payload_hash: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum LinkFrame {
    Subscription(SubscriptionRecord),
    Data(WireDataFrame),
    Ack(WireAckFrame),
}

fn transporter_to_sub_buffer_config(cfg: &goby_transport::TransporterConfig) -> SubBufferConfig {
    SubBufferConfig::new(cfg.ttl.unwrap_or(Duration::from_secs(10)), cfg.value_base.unwrap_or(1.0))
        .with_max_queue(cfg.max_queue.unwrap_or(usize::MAX))
        .with_blackout(cfg.blackout_time.unwrap_or_default())
        .with_newest_first(cfg.newest_first.unwrap_or(false))
        .with_ack_required(cfg.ack_required)
}

/// The intervehicle portal (spec.md §4.8): owns one [`ModemDriver`] link
/// and the [`DynamicBuffer`] of envelopes queued for transmission over it,
/// keyed by `(destination, group:type)`. Frames cross the link tagged as
/// one of a subscription record, a data frame, or an ack, using
/// `serde_json` the same way the broker's control messages ride JSON.
pub struct IntervehiclePortal {
    base: PortalBase,
    driver: Arc<dyn ModemDriver>,
    buffer: Mutex<DynamicBuffer<Envelope>>,
    pending_ack: Mutex<HashMap<EnvelopeIdentity, (u32, String)>>,
    ack_timeout: Duration,
}

impl IntervehiclePortal {
    pub fn new(inner: Arc<InterThread>, driver: Arc<dyn ModemDriver>, ack_timeout: Duration) -> Arc<Self> {
        let portal = Arc::new(Self {
            base: PortalBase::new(inner),
            driver,
            buffer: Mutex::new(DynamicBuffer::new(ack_timeout)),
            pending_ack: Mutex::new(HashMap::new()),
            ack_timeout,
        });

        let weak = Arc::downgrade(&portal);
        portal.base.subscribe_outgoing(move |envelope: Arc<Envelope>| {
            if let Some(p) = weak.upgrade() {
                p.enqueue_outgoing((*envelope).clone(), wall_clock_now());
            }
        });
        portal
    }

    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Drains this portal's interthread endpoint, running any queued
    /// ack/expire subscriber callbacks synchronously. Non-blocking.
    pub fn drain_events(&self) -> usize {
        self.base.inner().drain()
    }

    /// Queues `envelope` for transmission to `envelope.destination`,
    /// creating or merging that destination's sub-buffer (spec.md §3
    /// config merge rule). An overflow eviction past `max_queue` fires an
    /// `ExpireData{EXPIRED_BUFFER_OVERFLOW}` event.
    pub fn enqueue_outgoing(&self, envelope: Envelope, now: Instant) {
        let sub_id = format!("{}:{}", envelope.group, envelope.type_name);
        let destination = envelope.destination;
        let cfg = transporter_to_sub_buffer_config(&envelope.config);
        let evicted = {
            let mut buffer = self.buffer.lock();
            buffer.create_or_merge(destination, sub_id.clone(), cfg, now);
            buffer.push(destination, &sub_id, envelope, now).ok().flatten()
        };
        if let Some(evicted) = evicted {
            self.fire_expire(evicted.identity_key(), destination, ExpireReason::ExpiredBufferOverflow);
        }
    }

    /// `ModemDriverThread`'s data-request hook (spec.md §4.8): answers with
    /// the single highest-priority queued envelope addressed to
    /// `destination` that fits the link's frame size, transmitting it and
    /// either marking it ack-pending or popping it immediately. Returns
    /// `None` if nothing is queued, or if the winning candidate is larger
    /// than the link can carry in one frame (it stays queued for a later
    /// request).
    pub fn data_request(&self, destination: u32, now: Instant) -> Option<Envelope> {
        let max_bytes = self.driver.max_frame_bytes();
        let mut buffer = self.buffer.lock();
        let (dest, sub_id, candidate) = buffer.peek_for_dest(Some(destination), now).ok()?;
        if candidate.payload.len() > max_bytes {
            return None;
        }
        let envelope = candidate.clone();
        if envelope.config.ack_required {
            buffer.touch(dest, &sub_id, now);
            drop(buffer);
            self.pending_ack.lock().insert(envelope.identity_key(), (dest, sub_id));
        } else {
            buffer.pop_entry(dest, &sub_id, now);
        }

        let frame = LinkFrame::Data(WireDataFrame {
            group: envelope.group.to_string(),
            scheme_id: envelope.scheme,
            scheme_name: envelope.identifier.scheme.clone(),
            type_name: envelope.type_name.clone(),
            serialize_time_ms: envelope.serialize_time.as_millis() as u64,
            ack_required: envelope.config.ack_required,
            payload: envelope.payload.clone(),
        });
        self.driver.transmit(destination, encode(&frame));
        Some(envelope)
    }

    /// Transmits a subscription record to `destination` so the remote
    /// portal creates or merges a matching sub-buffer for this vehicle.
    pub fn propagate_subscription(&self, destination: u32, record: SubscriptionRecord) {
        self.driver.transmit(destination, encode(&LinkFrame::Subscription(record)));
    }

    /// Handles a frame received from `source` over the link: subscription
    /// records create/merge a local sub-buffer for that source, data
    /// frames are delivered to local forwarders (and ack'd back if
    /// required), and ack frames resolve a pending outbound entry.
    pub fn receive(&self, source: u32, bytes: &[u8], now: Instant) {
        let Ok(frame) = decode(bytes) else { return };
        match frame {
            LinkFrame::Subscription(record) => {
                let cfg = record.to_sub_buffer_config();
                self.buffer.lock().create_or_merge(source, record.sub_id(), cfg, now);
            }
            LinkFrame::Data(data) => {
                let envelope = Envelope {
                    identifier: Identifier::new(
                        data.group.clone(),
                        data.scheme_name.clone(),
                        data.type_name.clone(),
                        source,
                        0,
                    ),
                    group: Group::new(data.group.clone()),
                    scheme: data.scheme_id,
                    type_name: data.type_name.clone(),
                    serialize_time: Duration::from_millis(data.serialize_time_ms),
                    config: goby_transport::TransporterConfig { ack_required: data.ack_required, ..Default::default() },
                    payload: data.payload.clone(),
                    destination: 0,
                };
                if data.ack_required {
                    let ack = WireAckFrame {
                        group: data.group,
                        scheme_id: data.scheme_id,
                        scheme_name: data.scheme_name,
                        type_name: data.type_name,
                        serialize_time_ms: data.serialize_time_ms,
                        payload_hash: envelope.identity_key().payload_hash,
                    };
                    self.driver.transmit(source, encode(&LinkFrame::Ack(ack)));
                }
                self.base.deliver_incoming(envelope);
            }
            LinkFrame::Ack(ack) => {
                let identity = EnvelopeIdentity {
                    scheme: ack.scheme_id,
                    type_name: ack.type_name,
                    group: ack.group,
                    serialize_time: Duration::from_millis(ack.serialize_time_ms),
                    payload_hash: ack.payload_hash,
                };
                if let Some((dest, sub_id)) = self.pending_ack.lock().remove(&identity) {
                    self.buffer.lock().pop_entry(dest, &sub_id, now);
                    self.fire_ack(identity, source);
                }
            }
        }
    }

    /// Sweeps every sub-buffer for entries past their ttl, firing
    /// `ExpireData{EXPIRED_TTL}` for each and pruning any pending-ack
    /// entry that has sat unacknowledged past `ack_timeout`.
    pub fn sweep_expired(&self, now: Instant) {
        let expired = self.buffer.lock().expire_all(now);
        for ((destination, _sub_id), envelope) in expired {
            self.fire_expire(envelope.identity_key(), destination, ExpireReason::ExpiredTtl);
        }

        let mut pending = self.pending_ack.lock();
        let stale: Vec<EnvelopeIdentity> = pending
            .keys()
            .filter(|k| now.checked_sub(k.serialize_time).unwrap_or_default() > self.ack_timeout)
            .cloned()
            .collect();
        for identity in stale {
            if let Some((destination, _)) = pending.remove(&identity) {
                self.fire_expire(identity, destination, ExpireReason::ExpiredTtl);
            }
        }
    }

    /// Drops a destination's sub-buffer entirely once it has no
    /// subscribers left, firing `ExpireData{EXPIRED_NO_SUBSCRIBERS}` for
    /// anything still queued.
    pub fn drop_destination(&self, destination: u32, sub_id: &str) {
        let drained = self.buffer.lock().drain_sub_buffer(destination, sub_id);
        for envelope in drained {
            self.fire_expire(envelope.identity_key(), destination, ExpireReason::ExpiredNoSubscribers);
        }
    }

    pub fn subscribe_ack(&self, callback: impl Fn(Arc<AckData>) + Send + Sync + 'static) {
        self.base.inner().subscribe::<AckData>(&Group::new(ACK_GROUP), callback);
    }

    pub fn subscribe_expire(&self, callback: impl Fn(Arc<ExpireData>) + Send + Sync + 'static) {
        self.base.inner().subscribe::<ExpireData>(&Group::new(EXPIRE_GROUP), callback);
    }

    fn fire_ack(&self, identity: EnvelopeIdentity, destination: u32) {
        self.base.inner().publish(&Group::new(ACK_GROUP), AckData { identity, destination });
    }

    fn fire_expire(&self, identity: EnvelopeIdentity, destination: u32, reason: ExpireReason) {
        self.base.inner().publish(&Group::new(EXPIRE_GROUP), ExpireData { identity, destination, reason });
    }
}

fn encode(frame: &LinkFrame) -> Vec<u8> {
    serde_json::to_vec(frame).expect("link frame always serializes")
}

fn decode(bytes: &[u8]) -> Result<LinkFrame, serde_json::Error> {
    serde_json::from_slice(bytes)
}

fn wall_clock_now() -> Instant {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use goby_marshal::PROTOBUF;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn ms(n: u64) -> Instant {
        Duration::from_millis(n)
    }

    fn env(destination: u32, ack_required: bool, payload: &[u8]) -> Envelope {
        Envelope {
            identifier: Identifier::new("nav", "PROTOBUF", "Position", 1, 1),
            group: Group::new("nav"),
            scheme: PROTOBUF,
            type_name: "Position".into(),
            serialize_time: ms(0),
            config: goby_transport::TransporterConfig { ack_required, ..Default::default() },
            payload: payload.to_vec(),
            destination,
        }
    }

    #[test]
    fn data_request_transmits_and_pops_when_no_ack_required() {
        let driver = Arc::new(crate::driver::MockModemDriver::new(1024));
        let portal = IntervehiclePortal::new(Arc::new(InterThread::new()), driver.clone(), Duration::from_secs(1));

        portal.enqueue_outgoing(env(7, false, b"hello"), ms(0));
        let sent = portal.data_request(7, ms(10));
        assert!(sent.is_some());
        assert_eq!(driver.sent().len(), 1);
        assert_eq!(driver.sent()[0].0, 7);
        // Popped immediately: a second request finds nothing queued.
        assert!(portal.data_request(7, ms(20)).is_none());
    }

    #[test]
    fn ack_required_entry_stays_pending_until_acked() {
        let driver = Arc::new(crate::driver::MockModemDriver::new(1024));
        let portal = IntervehiclePortal::new(Arc::new(InterThread::new()), driver.clone(), Duration::from_secs(1));

        portal.enqueue_outgoing(env(3, true, b"important"), ms(0));
        let sent = portal.data_request(3, ms(10)).unwrap();
        assert_eq!(portal.pending_ack.lock().len(), 1);

        let acks = Arc::new(StdMutex::new(Vec::new()));
        let acks2 = acks.clone();
        portal.subscribe_ack(move |a| acks2.lock().unwrap().push(a.destination));

        let identity = sent.identity_key();
        let ack_frame = WireAckFrame {
            group: "nav".into(),
            scheme_id: PROTOBUF,
            scheme_name: "PROTOBUF".into(),
            type_name: "Position".into(),
            serialize_time_ms: identity.serialize_time.as_millis() as u64,
            payload_hash: identity.payload_hash,
        };
        portal.receive(3, &encode(&LinkFrame::Ack(ack_frame)), ms(20));
        portal.base.inner().drain();

        assert!(portal.pending_ack.lock().is_empty());
        assert_eq!(*acks.lock().unwrap(), vec![3]);
    }

    #[test]
    fn sweep_expired_fires_ttl_expiry_event() {
        let driver = Arc::new(crate::driver::MockModemDriver::new(1024));
        let portal = IntervehiclePortal::new(Arc::new(InterThread::new()), driver, Duration::from_secs(1));

        let mut e = env(9, false, b"stale");
        e.config.ttl = Some(ms(10));
        portal.enqueue_outgoing(e, ms(0));

        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        portal.subscribe_expire(move |ev| {
            assert_eq!(ev.reason, ExpireReason::ExpiredTtl);
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        portal.sweep_expired(ms(50));
        portal.base.inner().drain();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_destination_fires_no_subscribers_expiry_for_remaining_entries() {
        let driver = Arc::new(crate::driver::MockModemDriver::new(1024));
        let portal = IntervehiclePortal::new(Arc::new(InterThread::new()), driver, Duration::from_secs(1));
        portal.enqueue_outgoing(env(4, false, b"unsent"), ms(0));

        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        portal.subscribe_expire(move |ev| {
            assert_eq!(ev.reason, ExpireReason::ExpiredNoSubscribers);
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        portal.drop_destination(4, "nav:Position");
        portal.base.inner().drain();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!portal.buffer.lock().contains(4, "nav:Position"));
    }

    #[test]
    fn receiving_subscription_record_creates_destination_buffer() {
        let driver = Arc::new(crate::driver::MockModemDriver::new(1024));
        let portal = IntervehiclePortal::new(Arc::new(InterThread::new()), driver, Duration::from_secs(1));

        let record = SubscriptionRecord::new("nav", "Position", &goby_transport::TransporterConfig::default());
        portal.receive(42, &encode(&LinkFrame::Subscription(record)), ms(0));
        assert!(portal.buffer.lock().contains(42, "nav:Position"));
    }
}
