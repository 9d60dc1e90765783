use std::sync::Arc;

use goby_address::Group;

use crate::envelope::Envelope;
use crate::interthread::InterThread;

/// Reserved group a forwarder publishes outgoing envelopes to; the portal
/// sharing the same inner layer subscribes to it and transmits externally.
pub const FORWARD_GROUP: &str = "__goby_forward";
/// Reserved group a portal publishes inbound envelopes to; forwarders
/// sharing the inner layer subscribe to it to receive external traffic.
pub const RECEIVE_GROUP: &str = "__goby_receive";

/// Shared machinery behind every outward layer's **forwarder** half
/// (spec.md §4.6): it owns no external connection, it only publishes onto
/// its inner layer's reserved forward group and subscribes to the reserved
/// receive group. Multiple forwarders can sit behind one portal.
pub struct ForwarderBase {
    inner: Arc<InterThread>,
}

impl ForwarderBase {
    pub fn new(inner: Arc<InterThread>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<InterThread> {
        &self.inner
    }

    pub fn publish_outgoing(&self, envelope: Envelope) {
        self.inner.publish::<Envelope>(&Group::new(FORWARD_GROUP), envelope);
    }

    pub fn subscribe_incoming(&self, callback: impl Fn(Arc<Envelope>) + Send + Sync + 'static) {
        self.inner.subscribe::<Envelope>(&Group::new(RECEIVE_GROUP), callback);
    }
}

/// Shared machinery behind every outward layer's **portal** half: it owns
/// the external connection (broker socket, modem driver) and uses its
/// inner layer purely to talk to sibling forwarders in the same process.
pub struct PortalBase {
    inner: Arc<InterThread>,
}

impl PortalBase {
    pub fn new(inner: Arc<InterThread>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<InterThread> {
        &self.inner
    }

    pub fn subscribe_outgoing(&self, callback: impl Fn(Arc<Envelope>) + Send + Sync + 'static) {
        self.inner.subscribe::<Envelope>(&Group::new(FORWARD_GROUP), callback);
    }

    pub fn deliver_incoming(&self, envelope: Envelope) {
        self.inner.publish::<Envelope>(&Group::new(RECEIVE_GROUP), envelope);
    }
}
