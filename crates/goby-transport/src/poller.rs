use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Implemented by every transporter layer so a [`Poller`] can drain it
/// without blocking. Returns the number of events handled.
pub trait PollableLayer: Send + Sync {
    fn poll_once(&self) -> usize;
}

/// Cross-layer wait/wakeup (spec.md §4.9). One shared mutex + condvar is
/// threaded through every layer in a transporter stack at construction
/// time; `poll()` walks the chain **innermost first**, only checking an
/// outer layer once every inner layer has reported zero events, and
/// re-checks the whole chain on a spurious wakeup rather than assuming the
/// wakeup means work is ready.
pub struct Poller {
    gate: Arc<Mutex<()>>,
    condvar: Arc<Condvar>,
    // Innermost layer first.
    chain: Vec<Arc<dyn PollableLayer>>,
}

impl Poller {
    pub fn new(gate: Arc<Mutex<()>>, condvar: Arc<Condvar>) -> Self {
        Self { gate, condvar, chain: Vec::new() }
    }

    pub fn gate(&self) -> Arc<Mutex<()>> {
        self.gate.clone()
    }

    pub fn condvar(&self) -> Arc<Condvar> {
        self.condvar.clone()
    }

    /// Appends a layer to the chain. Call in innermost-to-outermost
    /// construction order (interthread first, then interprocess, etc.).
    pub fn push_outer(&mut self, layer: Arc<dyn PollableLayer>) {
        self.chain.push(layer);
    }

    fn drain_chain(&self) -> usize {
        let mut total = 0;
        for layer in &self.chain {
            let n = layer.poll_once();
            total += n;
            if n > 0 {
                break;
            }
        }
        total
    }

    /// Blocks until at least one event is processed or `timeout` elapses,
    /// returning the number of events handled (0 on timeout).
    pub fn poll(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let events = self.drain_chain();
            if events > 0 {
                return events;
            }

            let mut guard = self.gate.lock();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return 0;
            }
            let timed_out = self.condvar.wait_for(&mut guard, remaining).timed_out();
            drop(guard);
            if timed_out {
                return 0;
            }
            // Spurious wakeup or a real notification: loop re-checks the
            // whole chain rather than assuming which layer woke us.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLayer(AtomicUsize);
    impl PollableLayer for CountingLayer {
        fn poll_once(&self) -> usize {
            self.0.swap(0, Ordering::SeqCst)
        }
    }

    #[test]
    fn poll_times_out_with_zero_events_when_nothing_pending() {
        let poller = Poller::new(Arc::new(Mutex::new(())), Arc::new(Condvar::new()));
        assert_eq!(poller.poll(Duration::from_millis(10)), 0);
    }

    #[test]
    fn poll_short_circuits_on_first_nonzero_layer() {
        let mut poller = Poller::new(Arc::new(Mutex::new(())), Arc::new(Condvar::new()));
        let inner = Arc::new(CountingLayer(AtomicUsize::new(2)));
        let outer = Arc::new(CountingLayer(AtomicUsize::new(5)));
        poller.push_outer(inner.clone());
        poller.push_outer(outer.clone());

        let events = poller.poll(Duration::from_millis(10));
        assert_eq!(events, 2);
        // outer layer's counter was never drained because inner reported events.
        assert_eq!(outer.0.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn poll_falls_through_to_outer_when_inner_is_empty() {
        let mut poller = Poller::new(Arc::new(Mutex::new(())), Arc::new(Condvar::new()));
        let inner = Arc::new(CountingLayer(AtomicUsize::new(0)));
        let outer = Arc::new(CountingLayer(AtomicUsize::new(3)));
        poller.push_outer(inner);
        poller.push_outer(outer);

        assert_eq!(poller.poll(Duration::from_millis(10)), 3);
    }
}
