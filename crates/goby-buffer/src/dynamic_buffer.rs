use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::SubBufferConfig;
use crate::sub_buffer::{Instant, SubBuffer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("sub-buffer already exists for destination {destination}, sub {sub_id}")]
    AlreadyExists { destination: u32, sub_id: String },
    #[error("no sub-buffer for destination {destination}, sub {sub_id}")]
    NotFound { destination: u32, sub_id: String },
    /// Mirrors spec.md's `DynamicBufferNoDataException` control-flow signal:
    /// the contest ran but no candidate cleared blackout/ack-pending/empty
    /// filters.
    #[error("no data ready across any sub-buffer")]
    NoData,
}

/// A collection of [`SubBuffer`]s keyed by `(destination, sub_id)`, run
/// through a per-tick contest that picks the single highest-priority
/// candidate across all of them (spec.md §3, `DynamicBuffer`).
///
/// Keyed on a `BTreeMap` rather than a hash map so the contest's tie-break
/// (equal `top_value`) is deterministic: the first key in iteration order
/// wins, matching the original implementation's `std::map` iteration.
pub struct DynamicBuffer<T> {
    buffers: BTreeMap<(u32, String), SubBuffer<T>>,
    ack_timeout: std::time::Duration,
}

impl<T> DynamicBuffer<T> {
    pub fn new(ack_timeout: std::time::Duration) -> Self {
        Self { buffers: BTreeMap::new(), ack_timeout }
    }

    pub fn create(
        &mut self,
        destination: u32,
        sub_id: impl Into<String>,
        cfg: SubBufferConfig,
        now: Instant,
    ) -> Result<(), BufferError> {
        let sub_id = sub_id.into();
        let key = (destination, sub_id.clone());
        if self.buffers.contains_key(&key) {
            return Err(BufferError::AlreadyExists { destination, sub_id });
        }
        self.buffers.insert(key, SubBuffer::new(cfg, now));
        Ok(())
    }

    /// Merges `cfg` into the existing sub-buffer's config if one exists,
    /// otherwise creates it fresh.
    pub fn create_or_merge(
        &mut self,
        destination: u32,
        sub_id: impl Into<String>,
        cfg: SubBufferConfig,
        now: Instant,
    ) {
        let sub_id = sub_id.into();
        let key = (destination, sub_id);
        match self.buffers.get_mut(&key) {
            Some(existing) => {
                let merged = existing.cfg().merge(&cfg);
                existing.set_cfg(merged);
            }
            None => {
                self.buffers.insert(key, SubBuffer::new(cfg, now));
            }
        }
    }

    pub fn erase_sub_buffer(
        &mut self,
        destination: u32,
        sub_id: &str,
    ) -> Result<(), BufferError> {
        self.buffers
            .remove(&(destination, sub_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| BufferError::NotFound {
                destination,
                sub_id: sub_id.to_string(),
            })
    }

    pub fn push(
        &mut self,
        destination: u32,
        sub_id: &str,
        value: T,
        now: Instant,
    ) -> Result<Option<T>, BufferError> {
        let key = (destination, sub_id.to_string());
        let buf = self.buffers.get_mut(&key).ok_or_else(|| BufferError::NotFound {
            destination,
            sub_id: sub_id.to_string(),
        })?;
        Ok(buf.push(value, now))
    }

    pub fn size(&self) -> usize {
        self.buffers.values().map(SubBuffer::size).sum()
    }

    pub fn empty(&self) -> bool {
        self.buffers.values().all(SubBuffer::empty)
    }

    /// Runs the contest (spec.md §4.2):
    /// 1. Filter candidates by destination match (broadcast destination 0
    ///    matches anything), non-empty/non-blackout (both collapse to
    ///    `top_value` being finite), and ack-pending (`now - last_access <
    ///    ack_timeout` while `ack_required`).
    /// 2. Compute each remaining candidate's `top_value(now)`.
    /// 3. Pick the strictly-greatest value; on ties, or if every candidate
    ///    scores zero or below, the first one in `BTreeMap` iteration order
    ///    wins — the contest only returns `NoData` when no candidate
    ///    survives filtering, never because of low scores.
    pub fn top_key(&self, dest: Option<u32>, now: Instant) -> Result<(u32, String), BufferError> {
        let mut winner: Option<(&(u32, String), f64)> = None;
        for (key, buf) in self.buffers.iter() {
            if let Some(dest) = dest {
                if key.0 != dest && key.0 != 0 && dest != 0 {
                    continue;
                }
            }
            let pending_ack = buf.cfg().ack_required
                && now.checked_sub(buf.last_access()).unwrap_or_default() < self.ack_timeout;
            if pending_ack {
                continue;
            }
            let value = buf.top_value(now);
            if !value.is_finite() {
                continue;
            }
            match winner {
                Some((_, best)) if value <= best => {}
                _ => winner = Some((key, value)),
            }
        }
        winner.map(|(k, _)| k.clone()).ok_or(BufferError::NoData)
    }

    pub fn top(&mut self, now: Instant) -> Result<(u32, String, &T), BufferError> {
        let key = self.top_key(None, now)?;
        let buf = self.buffers.get_mut(&key).expect("contest key must exist");
        let value = buf.top(now).expect("contest only selects non-empty buffers");
        Ok((key.0, key.1, value))
    }

    pub fn top_for_dest(&mut self, dest: u32, now: Instant) -> Result<(u32, String, &T), BufferError> {
        let key = self.top_key(Some(dest), now)?;
        let buf = self.buffers.get_mut(&key).expect("contest key must exist");
        let value = buf.top(now).expect("contest only selects non-empty buffers");
        Ok((key.0, key.1, value))
    }

    /// Convenience combining the contest with an immediate pop of the
    /// winning entry — the pattern the intervehicle portal uses once a
    /// frame has been transmitted with no ack required.
    pub fn top_and_pop(&mut self, now: Instant) -> Result<(u32, String, T), BufferError> {
        let key = self.top_key(None, now)?;
        let buf = self.buffers.get_mut(&key).expect("contest key must exist");
        let value = buf.pop(now).expect("contest only selects non-empty buffers");
        Ok((key.0, key.1, value))
    }

    /// Read-only equivalent of [`DynamicBuffer::top_for_dest`]: runs the
    /// contest and returns the winning entry without bumping its
    /// `last_access`, so the caller can inspect it (e.g. to check whether
    /// an ack is required) before deciding whether to pop or touch it.
    pub fn peek_for_dest(&self, dest: Option<u32>, now: Instant) -> Result<(u32, String, &T), BufferError> {
        let key = self.top_key(dest, now)?;
        let buf = self.buffers.get(&key).expect("contest key must exist");
        let value = buf.peek().expect("contest only selects non-empty buffers");
        Ok((key.0, key.1, value))
    }

    /// Bumps the named sub-buffer's `last_access` to `now` without
    /// removing its front entry — used to mark an ack-required entry as
    /// "in flight" so the contest's ack-pending filter excludes it until
    /// either the ack arrives ([`DynamicBuffer::pop_entry`]) or
    /// `ack_timeout` elapses.
    pub fn touch(&mut self, destination: u32, sub_id: &str, now: Instant) {
        if let Some(buf) = self.buffers.get_mut(&(destination, sub_id.to_string())) {
            buf.top(now);
        }
    }

    /// Pops the front entry of the named sub-buffer directly, bypassing
    /// the cross-buffer contest. Used once an ack arrives for an entry
    /// previously marked in flight by [`DynamicBuffer::touch`].
    pub fn pop_entry(&mut self, destination: u32, sub_id: &str, now: Instant) -> Option<T> {
        self.buffers.get_mut(&(destination, sub_id.to_string())).and_then(|buf| buf.pop(now))
    }

    /// Like [`DynamicBuffer::top_and_pop`] but filtered to a single
    /// destination (or broadcast).
    pub fn top_and_pop_for_dest(&mut self, dest: u32, now: Instant) -> Result<(u32, String, T), BufferError> {
        let key = self.top_key(Some(dest), now)?;
        let buf = self.buffers.get_mut(&key).expect("contest key must exist");
        let value = buf.pop(now).expect("contest only selects non-empty buffers");
        Ok((key.0, key.1, value))
    }

    pub fn expire_all(&mut self, now: Instant) -> Vec<((u32, String), T)> {
        let mut expired = Vec::new();
        for (key, buf) in self.buffers.iter_mut() {
            for value in buf.expire(now) {
                expired.push((key.clone(), value));
            }
        }
        expired
    }

    /// Removes a sub-buffer outright, returning any entries it still held
    /// in serve order. Used when its last subscriber goes away and the
    /// remainder needs to be accounted for (e.g. as expiry events) rather
    /// than silently dropped.
    pub fn drain_sub_buffer(&mut self, destination: u32, sub_id: &str) -> Vec<T> {
        self.buffers.remove(&(destination, sub_id.to_string())).map(|mut buf| buf.drain()).unwrap_or_default()
    }

    pub fn contains(&self, destination: u32, sub_id: &str) -> bool {
        self.buffers.contains_key(&(destination, sub_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Instant {
        Duration::from_millis(n)
    }

    #[test]
    fn contest_picks_highest_priority_candidate() {
        let mut db: DynamicBuffer<&str> = DynamicBuffer::new(ms(1000));
        let cfg_a = SubBufferConfig::new(ms(10), 10.0).with_max_queue(10);
        let cfg_b = SubBufferConfig::new(ms(10), 1.0).with_max_queue(10);
        db.create(1, "a", cfg_a, ms(0)).unwrap();
        db.create(1, "b", cfg_b, ms(0)).unwrap();
        db.push(1, "a", "payload-a", ms(0)).unwrap();
        db.push(1, "b", "payload-b", ms(0)).unwrap();

        let (dest, sub_id, value) = db.top(ms(20)).unwrap();
        assert_eq!(dest, 1);
        assert_eq!(sub_id, "a");
        assert_eq!(*value, "payload-a");
    }

    #[test]
    fn tie_break_uses_map_iteration_order() {
        let mut db: DynamicBuffer<&str> = DynamicBuffer::new(ms(1000));
        let cfg = SubBufferConfig::new(ms(10), 1.0).with_max_queue(10);
        db.create(1, "a", cfg, ms(0)).unwrap();
        db.create(1, "z", cfg, ms(0)).unwrap();
        db.push(1, "z", "z-payload", ms(0)).unwrap();
        db.push(1, "a", "a-payload", ms(0)).unwrap();

        let (_, sub_id, _) = db.top(ms(20)).unwrap();
        assert_eq!(sub_id, "a");
    }

    #[test]
    fn empty_buffer_returns_no_data() {
        let db: DynamicBuffer<&str> = DynamicBuffer::new(ms(1000));
        assert_eq!(db.top_key(None, ms(0)), Err(BufferError::NoData));
    }

    #[test]
    fn ack_pending_excludes_recently_read_buffer() {
        let mut db: DynamicBuffer<&str> = DynamicBuffer::new(ms(100));
        let cfg = SubBufferConfig::new(ms(1000), 1.0).with_max_queue(10).with_ack_required(true);
        db.create(1, "a", cfg, ms(0)).unwrap();
        db.push(1, "a", "v1", ms(0)).unwrap();
        db.top(ms(0)).unwrap();
        db.push(1, "a", "v2", ms(1)).unwrap();
        assert_eq!(db.top_key(None, ms(10)), Err(BufferError::NoData));
        assert!(db.top_key(None, ms(200)).is_ok());
    }

    #[test]
    fn dest_filter_excludes_non_matching_non_broadcast_buffers() {
        let mut db: DynamicBuffer<&str> = DynamicBuffer::new(ms(1000));
        let cfg = SubBufferConfig::new(ms(10), 1.0).with_max_queue(10);
        db.create(5, "a", cfg, ms(0)).unwrap();
        db.push(5, "a", "for-five", ms(0)).unwrap();
        assert_eq!(db.top_key(Some(9), ms(20)), Err(BufferError::NoData));
        assert!(db.top_key(Some(5), ms(20)).is_ok());
    }

    #[test]
    fn peek_does_not_mutate_last_access() {
        let mut db: DynamicBuffer<&str> = DynamicBuffer::new(ms(1000));
        let cfg = SubBufferConfig::new(ms(10), 1.0).with_max_queue(10);
        db.create(1, "a", cfg, ms(0)).unwrap();
        db.push(1, "a", "payload", ms(0)).unwrap();

        let (_, _, value) = db.peek_for_dest(None, ms(20)).unwrap();
        assert_eq!(*value, "payload");
        // A second peek at a later time yields the same answer: peeking
        // must not have bumped last_access the way top() does.
        let (_, _, value) = db.peek_for_dest(None, ms(30)).unwrap();
        assert_eq!(*value, "payload");
    }

    #[test]
    fn touch_then_pop_entry_round_trips_an_ack_required_item() {
        let mut db: DynamicBuffer<&str> = DynamicBuffer::new(ms(100));
        let cfg = SubBufferConfig::new(ms(1000), 1.0).with_max_queue(10).with_ack_required(true);
        db.create(1, "a", cfg, ms(0)).unwrap();
        db.push(1, "a", "payload", ms(0)).unwrap();

        let (dest, sub_id, _) = db.peek_for_dest(None, ms(10)).unwrap();
        db.touch(dest, &sub_id, ms(10));
        // Touched entry is now ack-pending, so the contest excludes it.
        assert_eq!(db.top_key(None, ms(20)), Err(BufferError::NoData));

        assert_eq!(db.pop_entry(dest, &sub_id, ms(10)), Some("payload"));
        assert!(db.empty());
    }

    #[test]
    fn contest_picks_first_by_iteration_order_when_scores_tie_at_zero() {
        let mut db: DynamicBuffer<&str> = DynamicBuffer::new(ms(1000));
        let cfg = SubBufferConfig::new(ms(10), 1.0).with_max_queue(10);
        db.create(1, "a", cfg, ms(0)).unwrap();
        db.create(1, "b", cfg, ms(0)).unwrap();
        db.push(1, "a", "a-payload", ms(0)).unwrap();
        db.push(1, "b", "b-payload", ms(0)).unwrap();

        // now == last_access for both, so both score exactly zero.
        let (_, sub_id, _) = db.top(ms(0)).unwrap();
        assert_eq!(sub_id, "a");
    }
}
