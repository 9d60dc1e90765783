//! The intervehicle portal (spec.md §4.8): a `ModemDriver` seam for slow,
//! unreliable links, a `DynamicBuffer`-backed outbound queue per
//! destination, ack/expire event delivery, and subscription propagation
//! over the link itself.

pub mod driver;
pub mod events;
pub mod portal;
pub mod subscription;

pub use driver::{MockModemDriver, ModemDriver};
pub use events::{AckData, ExpireData, ExpireReason, ACK_GROUP, EXPIRE_GROUP};
pub use portal::IntervehiclePortal;
pub use subscription::SubscriptionRecord;
