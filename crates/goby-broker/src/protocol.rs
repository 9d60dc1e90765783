/// Wire framing for the on-host broker (spec.md §6): one message is the
/// identifier string, a NUL byte, then the payload bytes. The ZeroMQ
/// subscribe filter is simply a byte prefix of this frame, which happens
/// to equal the identifier prefix since the identifier comes first.
pub fn frame(identifier: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(identifier.len() + 1 + payload.len());
    buf.extend_from_slice(identifier.as_bytes());
    buf.push(0);
    buf.extend_from_slice(payload);
    buf
}

/// Splits a frame produced by [`frame`] back into `(identifier, payload)`.
/// Returns `None` if there is no NUL separator.
pub fn unframe(bytes: &[u8]) -> Option<(&str, &[u8])> {
    let pos = bytes.iter().position(|&b| b == 0)?;
    let identifier = std::str::from_utf8(&bytes[..pos]).ok()?;
    Some((identifier, &bytes[pos + 1..]))
}

/// Control messages exchanged between a client's main thread and read
/// thread over the inproc control socket (spec.md §4.7).
#[derive(Clone, Debug)]
pub enum ControlMessage {
    Subscribe { prefix: String },
    Unsubscribe { prefix: String },
    SubscribeAck { prefix: String },
    UnsubscribeAck { prefix: String },
    Receive { frame: Vec<u8> },
    PubConfiguration { publish_endpoint: String, subscribe_endpoint: String },
    RequestHoldState,
    NotifyHoldState { hold: bool },
    Shutdown,
}

/// Manager request/response kinds (spec.md §4.7/§6).
#[derive(Clone, Debug)]
pub enum ManagerRequest {
    ProvidePubSubSockets { client_name: String, pid: u32 },
    ProvideHoldState { client_name: String, pid: u32, ready: bool },
}

#[derive(Clone, Debug)]
pub struct ManagerResponse {
    pub client_name: String,
    pub hold: bool,
    pub publish_endpoint: String,
    pub subscribe_endpoint: String,
}
