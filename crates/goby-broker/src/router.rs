use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;

/// Opaque handle identifying a connected subscriber inside the mem-mode
/// [`Router`]. Meaningless outside the `Router` that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

struct Subscriber {
    id: ClientId,
    filters: Vec<String>,
    tx: Sender<Vec<u8>>,
}

/// The broker's XPUB/XSUB proxy (spec.md §4.7). In the default build this
/// is an in-process fan-out keyed by byte-prefix filters, mirroring the
/// wire semantics of a real ZeroMQ XPUB/XSUB pair without requiring a
/// socket; with `with-zmq` a real `zmq::proxy` is run between bound
/// XPUB/XSUB sockets instead, matching the teacher's
/// `bus::pubsub::mem`-default-plus-real-backend split.
pub struct Router {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Router {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), subscribers: Mutex::new(Vec::new()) }
    }

    /// Connects a new subscriber (the XSUB-facing side of a client), giving
    /// it a `ClientId` and the receiving end of its inbound channel.
    pub fn connect(&self) -> (ClientId, Receiver<Vec<u8>>) {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(Subscriber { id, filters: Vec::new(), tx });
        (id, rx)
    }

    pub fn disconnect(&self, id: ClientId) {
        self.subscribers.lock().retain(|s| s.id != id);
    }

    /// Adds a byte-prefix filter (the ZeroMQ `set_subscribe` analogue).
    pub fn set_subscribe(&self, id: ClientId, prefix: impl Into<String>) {
        if let Some(s) = self.subscribers.lock().iter_mut().find(|s| s.id == id) {
            s.filters.push(prefix.into());
        }
    }

    pub fn set_unsubscribe(&self, id: ClientId, prefix: &str) {
        if let Some(s) = self.subscribers.lock().iter_mut().find(|s| s.id == id) {
            s.filters.retain(|f| f != prefix);
        }
    }

    /// Forwards `frame` to every subscriber with a matching prefix filter
    /// (the XSUB-to-XPUB proxy step). A subscriber with no filters
    /// registered receives nothing, matching ZeroMQ's subscribe-to-receive
    /// requirement.
    pub fn publish(&self, frame: &[u8]) {
        for s in self.subscribers.lock().iter() {
            if s.filters.iter().any(|f| frame.starts_with(f.as_bytes())) {
                let _ = s.tx.send(frame.to_vec());
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_receives_only_matching_prefix() {
        let router = Router::new();
        let (id, rx) = router.connect();
        router.set_subscribe(id, "/nav/");

        router.publish(b"/nav/Position payload");
        router.publish(b"/ctl/Heading payload");

        let got = rx.recv().unwrap();
        assert_eq!(got, b"/nav/Position payload");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let router = Router::new();
        let (id, rx) = router.connect();
        router.set_subscribe(id, "/nav/");
        router.set_unsubscribe(id, "/nav/");

        router.publish(b"/nav/Position payload");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_removes_subscriber() {
        let router = Router::new();
        let (id, rx) = router.connect();
        router.set_subscribe(id, "/nav/");
        router.disconnect(id);

        router.publish(b"/nav/Position payload");
        assert!(rx.try_recv().is_err());
    }
}
