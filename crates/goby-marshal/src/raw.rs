use crate::registry::{MarshalError, Marshaller};
use crate::scheme::{SchemeId, NULL_SCHEME, RAW_BYTES};

/// Passes bytes through unchanged. Used for raw-bytes publications that
/// don't need structure on the wire.
pub struct RawBytesMarshaller {
    type_name: String,
}

impl RawBytesMarshaller {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into() }
    }
}

impl Marshaller<Vec<u8>> for RawBytesMarshaller {
    fn scheme(&self) -> SchemeId {
        RAW_BYTES
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn serialize(&self, value: &Vec<u8>) -> Result<Vec<u8>, MarshalError> {
        Ok(value.clone())
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<u8>, MarshalError> {
        Ok(bytes.to_vec())
    }
}

/// Always serializes to zero bytes and parses back the type's `Default`.
/// Useful for marker/ping messages that carry no payload.
pub struct NullMarshaller<T> {
    type_name: String,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> NullMarshaller<T> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), _marker: std::marker::PhantomData }
    }
}

impl<T: Default + Send + Sync> Marshaller<T> for NullMarshaller<T> {
    fn scheme(&self) -> SchemeId {
        NULL_SCHEME
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn serialize(&self, _value: &T) -> Result<Vec<u8>, MarshalError> {
        Ok(Vec::new())
    }

    fn parse(&self, _bytes: &[u8]) -> Result<T, MarshalError> {
        Ok(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bytes_round_trip() {
        let m = RawBytesMarshaller::new("blob");
        let bytes = m.serialize(&vec![1, 2, 3]).unwrap();
        assert_eq!(m.parse(&bytes).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn null_scheme_ignores_payload() {
        let m = NullMarshaller::<u32>::new("ping");
        assert!(m.serialize(&42).unwrap().is_empty());
        assert_eq!(m.parse(&[]).unwrap(), 0);
    }
}
