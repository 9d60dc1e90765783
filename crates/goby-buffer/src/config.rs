use std::time::Duration;

/// Treated as "one time unit" when a caller supplies a zero TTL, avoiding a
/// division by zero in the priority formula.
pub const MIN_TTL: Duration = Duration::from_micros(1);

/// Per-SubBuffer configuration. All fields are settable; when multiple
/// publishers request the same sub-buffer with different configs, the
/// configs are merged with [`SubBufferConfig::merge`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubBufferConfig {
    pub ttl: Duration,
    pub value_base: f64,
    pub max_queue: usize,
    pub blackout_time: Duration,
    pub newest_first: bool,
    pub ack_required: bool,
}

impl Default for SubBufferConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            value_base: 1.0,
            max_queue: usize::MAX,
            blackout_time: Duration::ZERO,
            newest_first: false,
            ack_required: false,
        }
    }
}

impl SubBufferConfig {
    pub fn new(ttl: Duration, value_base: f64) -> Self {
        Self { ttl: Self::clamp_ttl(ttl), value_base, ..Default::default() }
    }

    fn clamp_ttl(ttl: Duration) -> Duration {
        if ttl.is_zero() {
            MIN_TTL
        } else {
            ttl
        }
    }

    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    pub fn with_blackout(mut self, blackout_time: Duration) -> Self {
        self.blackout_time = blackout_time;
        self
    }

    pub fn with_newest_first(mut self, newest_first: bool) -> Self {
        self.newest_first = newest_first;
        self
    }

    pub fn with_ack_required(mut self, ack_required: bool) -> Self {
        self.ack_required = ack_required;
        self
    }

    /// Merge two configs per spec.md §3:
    /// - `ttl`, `value_base`: arithmetic mean
    /// - `ack_required`, `newest_first`: logical OR (true dominates)
    /// - `blackout_time`: minimum
    /// - `max_queue`: maximum
    ///
    /// Merging a config with itself N times is idempotent: mean/min/max/OR
    /// of identical inputs reproduce the same value.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            ttl: Self::clamp_ttl((self.ttl + other.ttl) / 2),
            value_base: (self.value_base + other.value_base) / 2.0,
            max_queue: self.max_queue.max(other.max_queue),
            blackout_time: self.blackout_time.min(other.blackout_time),
            newest_first: self.newest_first || other.newest_first,
            ack_required: self.ack_required || other.ack_required,
        }
    }

    pub fn merge_all(configs: &[Self]) -> Option<Self> {
        let mut iter = configs.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, cfg| acc.merge(cfg)))
    }
}
