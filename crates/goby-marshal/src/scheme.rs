/// Small integer tag naming a marshalling family.
pub type SchemeId = i32;

/// Identity scheme: used only on interthread, performs no copy and no
/// serialization (the value is moved by shared pointer).
pub const CXX_OBJECT: SchemeId = 0;
/// Protobuf-equivalent structured scheme (see [`crate::json::JsonMarshaller`]
/// for the in-repo stand-in; real Protobuf/DCCL codecs are an external
/// collaborator per the design's non-goals).
pub const PROTOBUF: SchemeId = 1;
/// DCCL-framed scheme, used on intervehicle links.
pub const DCCL: SchemeId = 2;
/// Null scheme: always serializes to zero bytes.
pub const NULL_SCHEME: SchemeId = 3;
/// Raw, unopinionated byte passthrough.
pub const RAW_BYTES: SchemeId = 4;
/// Wildcard matching any scheme (used in subscription filters).
pub const ALL_SCHEMES: SchemeId = -1;
