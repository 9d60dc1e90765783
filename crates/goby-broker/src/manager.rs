use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

/// Tracks which of a fixed set of required clients have reported in, and
/// answers `PROVIDE_PUB_SUB_SOCKETS`/`PROVIDE_HOLD_STATE` requests
/// (spec.md §4.7). A client holds its outgoing traffic until every
/// required client has reported ready, so a late joiner doesn't miss
/// messages published before it subscribed.
pub struct Manager {
    required: HashSet<String>,
    ready: Mutex<HashSet<String>>,
    publish_endpoint: String,
    subscribe_endpoint: String,
    release_hooks: Mutex<Vec<Arc<dyn Fn() + Send + Sync>>>,
}

impl Manager {
    pub fn new(
        required: impl IntoIterator<Item = String>,
        publish_endpoint: impl Into<String>,
        subscribe_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            required: required.into_iter().collect(),
            ready: Mutex::new(HashSet::new()),
            publish_endpoint: publish_endpoint.into(),
            subscribe_endpoint: subscribe_endpoint.into(),
            release_hooks: Mutex::new(Vec::new()),
        }
    }

    /// `PROVIDE_PUB_SUB_SOCKETS`: tells a connecting client which endpoints
    /// to bind its publish/subscribe sockets to.
    pub fn pub_sub_sockets(&self) -> (String, String) {
        (self.publish_endpoint.clone(), self.subscribe_endpoint.clone())
    }

    /// Registers a callback run when the hold transitions from held to
    /// released. Every [`crate::Client`] sharing this manager registers
    /// one so its own buffered traffic flushes the moment the *last*
    /// required client reports ready — not just when *it* does.
    pub fn on_release(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        self.release_hooks.lock().push(hook);
    }

    /// `PROVIDE_HOLD_STATE`: a client reports whether it has finished
    /// establishing its subscriptions. Returns whether the hold is still
    /// in effect (`true` means the caller should keep holding its publish
    /// queue).
    pub fn report_ready(&self, client_name: &str) -> bool {
        let was_holding = self.hold();
        self.ready.lock().insert(client_name.to_string());
        let still_holding = self.hold();
        if was_holding && !still_holding {
            for hook in self.release_hooks.lock().iter() {
                hook();
            }
        }
        still_holding
    }

    /// Whether any required client has not yet reported ready. A client
    /// with an empty `required` set never holds.
    pub fn hold(&self) -> bool {
        if self.required.is_empty() {
            return false;
        }
        let ready = self.ready.lock();
        !self.required.iter().all(|name| ready.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_until_all_required_clients_are_ready() {
        let manager = Manager::new(["nav".to_string(), "ctl".to_string()], "tcp://pub", "tcp://sub");
        assert!(manager.hold());
        assert!(manager.report_ready("nav"));
        assert!(!manager.report_ready("ctl"));
        assert!(!manager.hold());
    }

    #[test]
    fn never_holds_with_no_required_clients() {
        let manager = Manager::new(Vec::<String>::new(), "tcp://pub", "tcp://sub");
        assert!(!manager.hold());
    }

    #[test]
    fn release_hook_fires_only_on_the_transition_to_released() {
        let manager = Manager::new(vec!["a".to_string(), "b".to_string()], "tcp://pub", "tcp://sub");
        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fired2 = fired.clone();
        manager.on_release(Arc::new(move || {
            fired2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }));

        manager.report_ready("a");
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 0);
        manager.report_ready("b");
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
        // Reporting again after release must not re-fire the hook.
        manager.report_ready("b");
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn provides_configured_endpoints() {
        let manager = Manager::new(Vec::<String>::new(), "tcp://pub", "tcp://sub");
        assert_eq!(manager.pub_sub_sockets(), ("tcp://pub".to_string(), "tcp://sub".to_string()));
    }
}
