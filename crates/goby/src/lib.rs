//! Facade crate: pulls the address, marshalling, buffering, transport,
//! broker, and intervehicle layers together behind one `prelude` so an
//! application depends on a single crate (spec.md §1, "one pub/sub fabric
//! spanning four layers").

pub mod prelude {
    pub use goby_address::{Group, Identifier, IdentifierFactory};
    pub use goby_marshal::{
        JsonMarshaller, MarshalError, Marshaller, NullMarshaller, RawBytesMarshaller, Registry,
        SchemeId, ALL_SCHEMES, CXX_OBJECT, DCCL, NULL_SCHEME, PROTOBUF, RAW_BYTES,
    };
    pub use goby_buffer::{BufferError, DynamicBuffer, Instant, SubBuffer, SubBufferConfig};
    pub use goby_transport::{
        Envelope, EnvelopeIdentity, ForwarderBase, InterThread, PollableLayer, PortalBase, Poller,
        SubscriptionHandler, SubscriptionTable, TransporterConfig, FORWARD_GROUP, RECEIVE_GROUP,
    };
    pub use goby_transport::scheduler::coroner::{
        subscribe_coroner, HealthRequest, HealthResponse, HealthState, HEALTH_REQUEST_GROUP,
        HEALTH_RESPONSE_GROUP, HEALTH_RESPONSE_WINDOW,
    };
    pub use goby_transport::scheduler::terminate::{
        check_terminate, subscribe_terminate, TerminateRequest, TerminateResponse,
        TERMINATE_REQUEST_GROUP, TERMINATE_RESPONSE_GROUP,
    };
    pub use goby_broker::{Client as BrokerClient, ClientId, Manager as BrokerManager, Router};
    pub use goby_intervehicle::{
        AckData, ExpireData, ExpireReason, IntervehiclePortal, MockModemDriver, ModemDriver,
        SubscriptionRecord,
    };
}
