use std::collections::VecDeque;
use std::time::Duration;

use crate::config::SubBufferConfig;

/// Caller-supplied logical clock offset. Buffers never read the system
/// clock; every time-sensitive operation takes `now` explicitly so tests
/// can drive exact timed scenarios without sleeping.
pub type Instant = Duration;

struct Entry<T> {
    value: T,
    push_time: Instant,
}

/// A single time-weighted priority queue (spec.md §3). Holds values of one
/// subscription, ordered `newest_first` or oldest-first, evicting down to
/// `max_queue` and expiring entries past `ttl`.
pub struct SubBuffer<T> {
    cfg: SubBufferConfig,
    entries: VecDeque<Entry<T>>,
    last_access: Instant,
}

impl<T> SubBuffer<T> {
    pub fn new(cfg: SubBufferConfig, now: Instant) -> Self {
        Self { cfg, entries: VecDeque::new(), last_access: now }
    }

    pub fn cfg(&self) -> &SubBufferConfig {
        &self.cfg
    }

    pub fn set_cfg(&mut self, cfg: SubBufferConfig) {
        self.cfg = cfg;
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `value` at the configured end, evicting the tail if
    /// `max_queue` is now exceeded. Returns the evicted value, if any.
    ///
    /// When `newest_first` is true the new value is pushed to the front and
    /// the tail holds the oldest entry, so overflow evicts the oldest. When
    /// `newest_first` is false the new value is pushed to the back, which
    /// *is* the tail, so overflow evicts the value just inserted.
    pub fn push(&mut self, value: T, now: Instant) -> Option<T> {
        let entry = Entry { value, push_time: now };
        if self.cfg.newest_first {
            self.entries.push_front(entry);
        } else {
            self.entries.push_back(entry);
        }
        if self.entries.len() > self.cfg.max_queue {
            self.entries.pop_back().map(|e| e.value)
        } else {
            None
        }
    }

    /// Returns a reference to the highest-priority entry without removing
    /// it, bumping `last_access` so the next `top_value` measures decay
    /// from this read rather than from the last push.
    pub fn top(&mut self, now: Instant) -> Option<&T> {
        self.last_access = now;
        self.entries.front().map(|e| &e.value)
    }

    /// Reference to the highest-priority entry without bumping
    /// `last_access` or otherwise mutating state. Unlike [`SubBuffer::top`],
    /// repeated calls don't shift this buffer's priority relative to its
    /// siblings in a [`crate::DynamicBuffer`] contest.
    pub fn peek(&self) -> Option<&T> {
        self.entries.front().map(|e| &e.value)
    }

    pub fn pop(&mut self, now: Instant) -> Option<T> {
        self.last_access = now;
        self.entries.pop_front().map(|e| e.value)
    }

    /// Removes and returns every queued entry, in the order it would have
    /// been served (`top`/`pop` order). Used when a sub-buffer is being
    /// torn down outright (e.g. its last subscriber went away) and any
    /// remaining entries need to be accounted for rather than silently
    /// dropped.
    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).map(|e| e.value).collect()
    }

    /// Removes the first entry whose `push_time` exactly matches `at`.
    /// Entries are ordered monotonically by push time (newest at the
    /// configured head), so the scan stops as soon as it has passed where a
    /// match could be.
    pub fn erase(&mut self, at: Instant) -> Option<T> {
        let mut found = None;
        for (i, e) in self.entries.iter().enumerate() {
            if e.push_time == at {
                found = Some(i);
                break;
            }
            if self.cfg.newest_first && e.push_time < at {
                break;
            }
            if !self.cfg.newest_first && e.push_time > at {
                break;
            }
        }
        found.and_then(|i| self.entries.remove(i)).map(|e| e.value)
    }

    /// Sweeps entries whose `push_time + ttl < now`, in the direction that
    /// matches `newest_first` (oldest entries live at the back when
    /// `newest_first`, at the front otherwise), returning the expired
    /// values oldest-evicted-first.
    pub fn expire(&mut self, now: Instant) -> Vec<T> {
        let mut expired = Vec::new();
        loop {
            let stale = if self.cfg.newest_first {
                self.entries.back()
            } else {
                self.entries.front()
            }
            .is_some_and(|e| now.checked_sub(e.push_time).unwrap_or(Duration::ZERO) > self.cfg.ttl);

            if !stale {
                break;
            }
            let popped = if self.cfg.newest_first {
                self.entries.pop_back()
            } else {
                self.entries.pop_front()
            };
            match popped {
                Some(e) => expired.push(e.value),
                None => break,
            }
        }
        expired
    }

    /// Time-weighted priority of the buffer's current head, measured from
    /// `last_access` rather than from individual entry ages: the contest in
    /// [`crate::DynamicBuffer`] compares across buffers using one shared
    /// reference frame. Returns `f64::NEG_INFINITY` when empty or still
    /// inside the blackout window.
    pub fn top_value(&self, now: Instant) -> f64 {
        if self.entries.is_empty() {
            return f64::NEG_INFINITY;
        }
        let dt = now.checked_sub(self.last_access).unwrap_or(Duration::ZERO);
        if dt < self.cfg.blackout_time {
            return f64::NEG_INFINITY;
        }
        self.cfg.value_base * dt.as_secs_f64() / self.cfg.ttl.as_secs_f64()
    }

    pub fn last_access(&self) -> Instant {
        self.last_access
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Instant {
        Duration::from_millis(n)
    }

    #[test]
    fn overflow_direction_newest_first() {
        let cfg = SubBufferConfig::new(ms(100), 1.0).with_max_queue(2).with_newest_first(true);
        let mut buf = SubBuffer::new(cfg, ms(0));
        assert_eq!(buf.push(1, ms(0)), None);
        assert_eq!(buf.push(2, ms(1)), None);
        assert_eq!(buf.push(3, ms(2)), Some(1));
        assert_eq!(*buf.top(ms(3)).unwrap(), 3);
        buf.pop(ms(3));
        assert_eq!(*buf.top(ms(4)).unwrap(), 2);
    }

    #[test]
    fn overflow_evicts_just_inserted_when_oldest_first() {
        let cfg = SubBufferConfig::new(ms(100), 1.0).with_max_queue(1).with_newest_first(false);
        let mut buf = SubBuffer::new(cfg, ms(0));
        assert_eq!(buf.push(1, ms(0)), None);
        assert_eq!(buf.push(2, ms(1)), Some(2));
        assert_eq!(*buf.top(ms(2)).unwrap(), 1);
    }

    #[test]
    fn expire_sweeps_stale_entries() {
        let cfg = SubBufferConfig::new(ms(10), 1.0).with_max_queue(10).with_newest_first(false);
        let mut buf = SubBuffer::new(cfg, ms(0));
        buf.push("a", ms(0));
        buf.push("b", ms(5));
        buf.push("c", ms(20));
        let expired = buf.expire(ms(25));
        assert_eq!(expired, vec!["a"]);
        assert_eq!(buf.size(), 2);
    }

    #[test]
    fn blackout_suppresses_priority() {
        let cfg = SubBufferConfig::new(ms(100), 1.0).with_max_queue(10).with_blackout(ms(5));
        let mut buf = SubBuffer::new(cfg, ms(0));
        buf.push("x", ms(0));
        assert_eq!(buf.top_value(ms(3)), f64::NEG_INFINITY);
        assert!(buf.top_value(ms(6)) > 0.0);
    }

    #[test]
    fn empty_buffer_has_neg_infinity_priority() {
        let cfg = SubBufferConfig::new(ms(100), 1.0);
        let buf = SubBuffer::<u32>::new(cfg, ms(0));
        assert_eq!(buf.top_value(ms(50)), f64::NEG_INFINITY);
    }
}
