use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::manager::Manager;
use crate::protocol;
use crate::router::{ClientId, Router};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SubState {
    WaitingAck,
    Active,
}

struct Subscription {
    state: SubState,
    buffered: Vec<Vec<u8>>,
    callback: Arc<dyn Fn(&[u8]) + Send + Sync>,
}

/// A broker client (spec.md §4.7): a main thread that publishes through
/// the [`Router`] (holding traffic while [`Manager::hold`] is true) and a
/// read thread that drains the router's delivery channel, running a
/// subscribe/unsubscribe acknowledgement state machine
/// (`WAITING_ACK` → `ACTIVE`) so messages that arrive before a
/// subscription is acknowledged are buffered rather than dropped.
pub struct Client {
    router: Arc<Router>,
    manager: Arc<Manager>,
    name: String,
    id: ClientId,
    subscriptions: Mutex<HashMap<String, Subscription>>,
    hold_buffer: Mutex<VecDeque<Vec<u8>>>,
    read_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    pub fn new(router: Arc<Router>, manager: Arc<Manager>, name: impl Into<String>) -> Arc<Self> {
        let (id, rx) = router.connect();
        let client = Arc::new(Self {
            router,
            manager,
            name: name.into(),
            id,
            subscriptions: Mutex::new(HashMap::new()),
            hold_buffer: Mutex::new(VecDeque::new()),
            read_thread: Mutex::new(None),
        });

        let weak: Weak<Client> = Arc::downgrade(&client);
        let handle = thread::spawn(move || {
            while let Ok(frame) = rx.recv() {
                match weak.upgrade() {
                    Some(client) => client.handle_frame(&frame),
                    None => break,
                }
            }
        });
        *client.read_thread.lock() = Some(handle);

        // Register so this client's hold buffer flushes as soon as the
        // *last* required client reports ready, not only when this one
        // does (spec.md §8 scenario #5).
        let release_weak: Weak<Client> = Arc::downgrade(&client);
        client.manager.on_release(Arc::new(move || {
            if let Some(client) = release_weak.upgrade() {
                client.release_hold();
            }
        }));

        client
    }

    fn handle_frame(&self, frame: &[u8]) {
        let Some((identifier, payload)) = protocol::unframe(frame) else { return };
        let mut subs = self.subscriptions.lock();
        for (prefix, sub) in subs.iter_mut() {
            if !identifier.starts_with(prefix.as_str()) {
                continue;
            }
            match sub.state {
                SubState::Active => (sub.callback)(payload),
                SubState::WaitingAck => sub.buffered.push(payload.to_vec()),
            }
        }
    }

    /// `SUBSCRIBE`: registers interest in `prefix`. In mem mode the router
    /// registers the filter synchronously, so the `WAITING_ACK` window
    /// closes immediately after; a `with-zmq` client would wait for the
    /// manager's `SUBSCRIBE_ACK` round trip before flushing buffered frames.
    pub fn subscribe(&self, prefix: impl Into<String>, callback: Arc<dyn Fn(&[u8]) + Send + Sync>) {
        let prefix = prefix.into();
        self.subscriptions
            .lock()
            .insert(prefix.clone(), Subscription { state: SubState::WaitingAck, buffered: Vec::new(), callback });
        self.router.set_subscribe(self.id, prefix.clone());
        self.ack_subscribe(&prefix);
    }

    fn ack_subscribe(&self, prefix: &str) {
        let (buffered, callback) = {
            let mut subs = self.subscriptions.lock();
            let Some(sub) = subs.get_mut(prefix) else { return };
            sub.state = SubState::Active;
            (std::mem::take(&mut sub.buffered), sub.callback.clone())
        };
        for payload in buffered {
            callback(&payload);
        }
    }

    /// `UNSUBSCRIBE`.
    pub fn unsubscribe(&self, prefix: &str) {
        self.router.set_unsubscribe(self.id, prefix);
        self.subscriptions.lock().remove(prefix);
    }

    /// Publishes `payload` under `identifier`. While the manager's hold is
    /// in effect the frame is queued rather than sent, so a slow joiner
    /// doesn't lose traffic published before it finished subscribing
    /// (spec.md §8 scenario #5).
    pub fn publish(&self, identifier: &str, payload: &[u8]) {
        let frame = protocol::frame(identifier, payload);
        if self.manager.hold() {
            self.hold_buffer.lock().push_back(frame);
        } else {
            self.router.publish(&frame);
        }
    }

    /// Reports this client ready to the manager and flushes the hold
    /// buffer if the hold has lifted as a result.
    pub fn report_ready(&self) {
        self.manager.report_ready(&self.name);
        self.release_hold();
    }

    fn release_hold(&self) {
        if self.manager.hold() {
            return;
        }
        let mut buf = self.hold_buffer.lock();
        while let Some(frame) = buf.pop_front() {
            self.router.publish(&frame);
        }
    }

    pub fn shutdown(self: &Arc<Self>) {
        self.router.disconnect(self.id);
        if let Some(handle) = self.read_thread.lock().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use crate::manager::Manager;
    use crate::router::Router;

    #[test]
    fn publish_held_until_all_required_clients_ready() {
        let router = Arc::new(Router::new());
        let manager = Arc::new(Manager::new(
            vec!["nav".to_string(), "ctl".to_string()],
            "inproc://pub",
            "inproc://sub",
        ));

        let nav = Client::new(router.clone(), manager.clone(), "nav");
        let ctl = Client::new(router.clone(), manager.clone(), "ctl");
        let listener = Client::new(router.clone(), manager.clone(), "listener");

        let received = Arc::new(StdMutex::new(Vec::new()));
        let received2 = received.clone();
        listener.subscribe(
            "/nav/Position",
            Arc::new(move |payload: &[u8]| received2.lock().unwrap().push(payload.to_vec())),
        );

        nav.publish("/nav/Position", b"hold-me");
        thread::sleep(Duration::from_millis(20));
        assert!(received.lock().unwrap().is_empty(), "hold should suppress delivery");

        ctl.report_ready();
        thread::sleep(Duration::from_millis(20));
        assert!(received.lock().unwrap().is_empty(), "still holding: nav not ready");

        nav.report_ready();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(*received.lock().unwrap(), vec![b"hold-me".to_vec()]);

        nav.shutdown();
        ctl.shutdown();
        listener.shutdown();
    }

    #[test]
    fn frames_arriving_before_ack_are_buffered_not_dropped() {
        let router = Arc::new(Router::new());
        let manager = Arc::new(Manager::new(Vec::<String>::new(), "inproc://pub", "inproc://sub"));
        let publisher = Client::new(router.clone(), manager.clone(), "pub");
        let subscriber = Client::new(router.clone(), manager.clone(), "sub");

        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        subscriber.subscribe("/status/", Arc::new(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        }));
        publisher.publish("/status/ok", b"1");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        publisher.shutdown();
        subscriber.shutdown();
    }
}
