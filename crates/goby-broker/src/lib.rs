//! The interprocess broker (spec.md §4.7): a Router proxy, a Manager that
//! tracks hold state across a fixed set of required clients, and a Client
//! pairing a publishing main thread with a subscribing read thread.

pub mod client;
pub mod manager;
pub mod protocol;
pub mod router;

#[cfg(feature = "with-zmq")]
pub mod zmq_backend;

pub use client::Client;
pub use manager::Manager;
pub use protocol::{frame, unframe, ControlMessage, ManagerRequest, ManagerResponse};
pub use router::{ClientId, Router};
