//! Time-weighted priority buffering (see spec.md §3): `SubBuffer` holds one
//! subscription's queued values and decays their priority over time;
//! `DynamicBuffer` runs the per-tick contest across a whole collection of
//! them, keyed by `(destination, sub_id)`.

mod config;
mod dynamic_buffer;
mod sub_buffer;

pub use config::{SubBufferConfig, MIN_TTL};
pub use dynamic_buffer::{BufferError, DynamicBuffer};
pub use sub_buffer::{Instant, SubBuffer};
