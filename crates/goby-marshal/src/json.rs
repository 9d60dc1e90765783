use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use crate::registry::{MarshalError, Marshaller};
use crate::scheme::{SchemeId, PROTOBUF};

/// Serde-JSON-backed marshaller. Stands in for the structured schemes
/// (Protobuf/DCCL) whose actual codec generators are an external
/// collaborator (see spec.md Non-goals); it satisfies the same
/// serialize/parse/type_name contract deterministically.
pub struct JsonMarshaller<T> {
    scheme: SchemeId,
    type_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonMarshaller<T> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self::with_scheme(PROTOBUF, type_name)
    }

    pub fn with_scheme(scheme: SchemeId, type_name: impl Into<String>) -> Self {
        Self { scheme, type_name: type_name.into(), _marker: PhantomData }
    }
}

impl<T: Serialize + DeserializeOwned + Send + Sync> Marshaller<T> for JsonMarshaller<T> {
    fn scheme(&self) -> SchemeId {
        self.scheme
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn serialize(&self, value: &T) -> Result<Vec<u8>, MarshalError> {
        serde_json::to_vec(value).map_err(|e| MarshalError::Serialize(e.to_string()))
    }

    fn parse(&self, bytes: &[u8]) -> Result<T, MarshalError> {
        serde_json::from_slice(bytes).map_err(|e| MarshalError::Parse(e.to_string()))
    }
}
