use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Condvar, Mutex};

use goby_address::Group;

use crate::poller::PollableLayer;

type DispatchFn = dyn Fn(Arc<dyn Any + Send + Sync>) + Send + Sync;

struct Subscriber {
    inbox: Weak<Inbox>,
    dispatch: Arc<DispatchFn>,
}

/// Process-wide map from `(group key, TypeId)` to the subscribers
/// registered for it. Mirrors the teacher's `bus::pubsub::mem` pattern of a
/// single process-wide registry behind a mutex, generalized with a
/// type-erasure dispatch closure (the same trick used by
/// `goby_marshal::Registry`) so arbitrary `T` can share one map.
static REGISTRY: OnceLock<Mutex<HashMap<(String, TypeId), Vec<Subscriber>>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<(String, TypeId), Vec<Subscriber>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

struct Inbox {
    queue: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

/// Interthread transporter (spec.md §4.6, "Interthread specifics"). Data
/// travels as `Arc<T>` with no copy: a publisher hands a value to every
/// subscribed thread's per-thread inbox (a mutex-protected deque), and the
/// subscriber drains its inbox during [`InterThread::poll`]. Each instance
/// is one thread's endpoint and owns the innermost mutex/condvar of that
/// thread's transporter stack, which outer layers (forwarders/portals)
/// reuse so a single `poll()` can wait on any layer's event.
pub struct InterThread {
    inbox: Arc<Inbox>,
    gate: Arc<Mutex<()>>,
    condvar: Arc<Condvar>,
}

impl InterThread {
    pub fn new() -> Self {
        Self {
            inbox: Arc::new(Inbox { queue: Mutex::new(VecDeque::new()) }),
            gate: Arc::new(Mutex::new(())),
            condvar: Arc::new(Condvar::new()),
        }
    }

    pub fn gate(&self) -> Arc<Mutex<()>> {
        self.gate.clone()
    }

    pub fn condvar(&self) -> Arc<Condvar> {
        self.condvar.clone()
    }

    fn key(group: &Group, type_id: TypeId) -> (String, TypeId) {
        (group.to_string(), type_id)
    }

    /// Registers `callback` to run (on this thread, during `poll`) whenever
    /// `T` is published to `group` from any thread.
    pub fn subscribe<T: Any + Send + Sync + 'static>(
        &self,
        group: &Group,
        callback: impl Fn(Arc<T>) + Send + Sync + 'static,
    ) {
        let dispatch: Arc<DispatchFn> = Arc::new(move |value: Arc<dyn Any + Send + Sync>| {
            if let Ok(typed) = value.downcast::<T>() {
                callback(typed);
            }
        });
        let subscriber = Subscriber { inbox: Arc::downgrade(&self.inbox), dispatch };
        registry()
            .lock()
            .entry(Self::key(group, TypeId::of::<T>()))
            .or_default()
            .push(subscriber);
    }

    /// Removes every subscription this instance's inbox holds for `group`/`T`.
    pub fn unsubscribe<T: Any + Send + Sync + 'static>(&self, group: &Group) {
        if let Some(subs) = registry().lock().get_mut(&Self::key(group, TypeId::of::<T>())) {
            subs.retain(|s| match s.inbox.upgrade() {
                Some(inbox) => !Arc::ptr_eq(&inbox, &self.inbox),
                None => false,
            });
        }
    }

    /// Drops every subscription owned by this instance, across all groups
    /// and types. Idempotent.
    pub fn unsubscribe_all(&self) {
        let mut reg = registry().lock();
        for subs in reg.values_mut() {
            subs.retain(|s| match s.inbox.upgrade() {
                Some(inbox) => !Arc::ptr_eq(&inbox, &self.inbox),
                None => false,
            });
        }
    }

    /// Publishes `value` to every subscriber of `group`/`T`, across all
    /// threads. The publisher must not mutate `value` afterward; this is a
    /// documented contract, not enforced.
    pub fn publish<T: Any + Send + Sync + 'static>(&self, group: &Group, value: T) {
        let boxed: Arc<dyn Any + Send + Sync> = Arc::new(value);
        let mut reg = registry().lock();
        let key = Self::key(group, TypeId::of::<T>());
        if let Some(subs) = reg.get_mut(&key) {
            subs.retain(|s| s.inbox.upgrade().is_some());
            for sub in subs.iter() {
                if let Some(inbox) = sub.inbox.upgrade() {
                    let dispatch = sub.dispatch.clone();
                    let value = boxed.clone();
                    inbox.queue.lock().push_back(Box::new(move || dispatch(value)));
                }
            }
        }
        drop(reg);
        self.condvar.notify_all();
    }

    /// Drains this thread's inbox, running each queued callback
    /// synchronously on the calling thread. Non-blocking.
    pub fn drain(&self) -> usize {
        let mut drained = 0;
        loop {
            let next = self.inbox.queue.lock().pop_front();
            match next {
                Some(thunk) => {
                    thunk();
                    drained += 1;
                }
                None => break,
            }
        }
        drained
    }
}

impl Default for InterThread {
    fn default() -> Self {
        Self::new()
    }
}

impl PollableLayer for InterThread {
    fn poll_once(&self) -> usize {
        self.drain()
    }
}
