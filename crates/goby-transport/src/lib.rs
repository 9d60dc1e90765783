//! The layered transporter stack (spec.md §4.6): subscription tables,
//! the interthread layer, the forwarder/portal composition pattern outer
//! layers build on, the cross-layer poller, and scheduler glue. Concrete
//! outward portals (broker, modem link) live in `goby-broker` and
//! `goby-intervehicle`, built on top of the primitives here.

pub mod envelope;
pub mod forwarder;
pub mod interthread;
pub mod poller;
pub mod scheduler;
pub mod subscription;

pub use envelope::{Envelope, EnvelopeIdentity, TransporterConfig};
pub use forwarder::{ForwarderBase, PortalBase, FORWARD_GROUP, RECEIVE_GROUP};
pub use interthread::InterThread;
pub use poller::{PollableLayer, Poller};
pub use subscription::{SubscriptionHandler, SubscriptionTable};
