use std::sync::Arc;

use goby_address::Group;

use crate::interthread::InterThread;

pub const TERMINATE_REQUEST_GROUP: &str = "__goby_terminate_request";
pub const TERMINATE_RESPONSE_GROUP: &str = "__goby_terminate_response";

#[derive(Clone, Debug, Default)]
pub struct TerminateRequest {
    pub target_name: Option<String>,
    pub target_pid: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct TerminateResponse {
    pub target_name: String,
    pub target_pid: u32,
}

/// Checks whether `request` targets this application, by name or by pid
/// (spec.md §4.10). Grounded on
/// `goby/middleware/terminate/terminate.h`'s `check_terminate`.
pub fn check_terminate(
    request: &TerminateRequest,
    app_name: &str,
    pid: u32,
) -> Option<TerminateResponse> {
    let matched = request.target_name.as_deref() == Some(app_name)
        || request.target_pid == Some(pid);
    if matched {
        Some(TerminateResponse { target_name: app_name.to_string(), target_pid: pid })
    } else {
        None
    }
}

/// Registers the terminate handshake: on a matching request, replies with
/// this process's pid then invokes `on_quit`.
pub fn subscribe_terminate(
    interthread: &Arc<InterThread>,
    app_name: impl Into<String> + Clone + Send + Sync + 'static,
    pid: u32,
    on_quit: impl Fn() + Send + Sync + 'static,
) {
    let publisher = interthread.clone();
    interthread.subscribe::<TerminateRequest>(&Group::new(TERMINATE_REQUEST_GROUP), move |req| {
        let name = app_name.clone().into();
        if let Some(resp) = check_terminate(&req, &name, pid) {
            publisher.publish(&Group::new(TERMINATE_RESPONSE_GROUP), resp);
            on_quit();
        }
    });
}
