//! Addressing primitives for the goby-middleware pub/sub fabric: [`Group`]
//! (symbolic group name plus optional numeric tag) and [`Identifier`] (the
//! wire-level routing key built from group, scheme, type, pid and thread).

mod group;
mod identifier;

pub use group::{Group, BROADCAST_NUMERIC, INVALID_NUMERIC};
pub use identifier::{Identifier, IdentifierError, IdentifierFactory};
