use std::sync::Arc;
use std::time::Duration;

use goby_address::Group;

use crate::interthread::InterThread;

/// A thread's self-reported health (spec.md §4.10). Grounded on
/// `goby/middleware/coroner/coroner.h`'s `ThreadHealth`/`ProcessHealth`
/// messages, flattened into one response type since this crate doesn't
/// carry a separate per-thread vs. per-process message schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthState {
    Ok,
    Degraded,
    Failed,
}

#[derive(Clone, Debug)]
pub struct HealthRequest;

#[derive(Clone, Debug)]
pub struct HealthResponse {
    pub name: String,
    pub pid: u32,
    pub state: HealthState,
}

/// The reserved group a coroner health check request is published to; any
/// participating thread/process subscribes here and answers on
/// [`HEALTH_RESPONSE_GROUP`].
pub const HEALTH_REQUEST_GROUP: &str = "__goby_health_request";
pub const HEALTH_RESPONSE_GROUP: &str = "__goby_health_response";

/// How long a process-level coroner waits for all child-thread responses
/// before replying to an external health check (spec.md §4.10, "≈1 s").
pub const HEALTH_RESPONSE_WINDOW: Duration = Duration::from_secs(1);

/// Registers a thread's response to a coroner health check (spec.md
/// §4.10). On receipt of a `HealthRequest`, the thread replies with its
/// name, pid, and current `HealthState`, computed by `health_fn`, on
/// [`HEALTH_RESPONSE_GROUP`] of the same interthread endpoint.
pub fn subscribe_coroner(
    interthread: &Arc<InterThread>,
    name: impl Into<String> + Clone + Send + Sync + 'static,
    pid: u32,
    health_fn: impl Fn() -> HealthState + Send + Sync + 'static,
) {
    let publisher = interthread.clone();
    interthread.subscribe::<HealthRequest>(&Group::new(HEALTH_REQUEST_GROUP), move |_req| {
        let response = HealthResponse { name: name.clone().into(), pid, state: health_fn() };
        publisher.publish(&Group::new(HEALTH_RESPONSE_GROUP), response);
    });
}

/// Collects health responses gathered within [`HEALTH_RESPONSE_WINDOW`] of
/// the request, aggregating the worst reported state. Threads that never
/// respond within the window are simply absent from `responses` — the
/// caller decides whether that counts as `Failed`.
pub fn aggregate(responses: &[HealthResponse]) -> HealthState {
    let mut worst = HealthState::Ok;
    for r in responses {
        worst = match (worst, r.state) {
            (_, HealthState::Failed) | (HealthState::Failed, _) => HealthState::Failed,
            (_, HealthState::Degraded) | (HealthState::Degraded, _) => HealthState::Degraded,
            _ => HealthState::Ok,
        };
    }
    worst
}
