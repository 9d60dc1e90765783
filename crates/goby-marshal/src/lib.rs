//! Serializer registry abstraction (see spec.md §4.4). Defines the
//! `Marshaller` trait contract and a small, injectable `Registry`; concrete
//! production codecs (Protobuf, DCCL) are an external collaborator, so this
//! crate ships only the contract plus deterministic reference
//! implementations (JSON, raw bytes, null).

mod json;
mod raw;
mod registry;
mod scheme;

pub use json::JsonMarshaller;
pub use raw::{NullMarshaller, RawBytesMarshaller};
pub use registry::{MarshalError, Marshaller, Registry};
pub use scheme::{SchemeId, ALL_SCHEMES, CXX_OBJECT, DCCL, NULL_SCHEME, PROTOBUF, RAW_BYTES};
