use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::scheme::SchemeId;

#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("no marshaller registered for scheme {scheme} and this type")]
    NotRegistered { scheme: SchemeId },
    #[error("failed to serialize: {0}")]
    Serialize(String),
    #[error("failed to parse: {0}")]
    Parse(String),
}

/// Maps a typed value to and from bytes under a scheme tag.
///
/// Each `(scheme, T)` pair supplies `serialize`, `parse`, and `type_name`.
/// All outward-facing schemes must be deterministic: the same input always
/// produces the same bytes, so a receiver parsing the bytes reconstructs the
/// original value.
pub trait Marshaller<T>: Send + Sync {
    fn scheme(&self) -> SchemeId;
    fn type_name(&self) -> &str;
    fn serialize(&self, value: &T) -> Result<Vec<u8>, MarshalError>;
    fn parse(&self, bytes: &[u8]) -> Result<T, MarshalError>;
}

/// Registry keyed by `(scheme, type-name)`, injected at construction rather
/// than held in a module-level static so tests can build an isolated
/// registry per case.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<(SchemeId, TypeId), Box<dyn Any + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: 'static>(&mut self, marshaller: impl Marshaller<T> + 'static) {
        let key = (marshaller.scheme(), TypeId::of::<T>());
        let boxed: Arc<dyn Marshaller<T>> = Arc::new(marshaller);
        self.entries.insert(key, Box::new(boxed));
    }

    pub fn get<T: 'static>(&self, scheme: SchemeId) -> Option<Arc<dyn Marshaller<T>>> {
        self.entries
            .get(&(scheme, TypeId::of::<T>()))
            .and_then(|boxed| boxed.downcast_ref::<Arc<dyn Marshaller<T>>>())
            .cloned()
    }

    pub fn serialize<T: 'static>(&self, scheme: SchemeId, value: &T) -> Result<Vec<u8>, MarshalError> {
        self.get::<T>(scheme)
            .ok_or(MarshalError::NotRegistered { scheme })?
            .serialize(value)
    }

    pub fn parse<T: 'static>(&self, scheme: SchemeId, bytes: &[u8]) -> Result<T, MarshalError> {
        self.get::<T>(scheme)
            .ok_or(MarshalError::NotRegistered { scheme })?
            .parse(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonMarshaller;
    use crate::scheme::PROTOBUF;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Position {
        lat: f64,
        lon: f64,
    }

    #[test]
    fn round_trip_through_registry() {
        let mut registry = Registry::new();
        registry.register::<Position>(JsonMarshaller::<Position>::new("Position"));

        let value = Position { lat: 41.7, lon: -71.4 };
        let bytes = registry.serialize(PROTOBUF, &value).unwrap();
        let parsed: Position = registry.parse(PROTOBUF, &bytes).unwrap();
        assert_eq!(value, parsed);
    }

    #[test]
    fn unregistered_scheme_errors() {
        let registry = Registry::new();
        let err = registry.serialize::<Position>(PROTOBUF, &Position { lat: 0.0, lon: 0.0 });
        assert!(matches!(err, Err(MarshalError::NotRegistered { .. })));
    }
}
