//! Real ZeroMQ XPUB/XSUB proxy, enabled by the `with-zmq` feature. Mirrors
//! the teacher's `bus::pubsub` real-backend module: the mem [`crate::Router`]
//! stays the default so the rest of the crate can be exercised without a
//! libzmq dependency, and this module is the swap-in used once an actual
//! interprocess transport is wired up.

use std::thread::{self, JoinHandle};

use zmq::Context;

/// Runs `zmq::proxy` between a bound XSUB socket (clients publish here)
/// and a bound XPUB socket (clients subscribe here) on a dedicated
/// thread. Blocks until the proxy errors out, which only happens if one
/// of the sockets is closed out from under it.
pub fn spawn_proxy(
    context: &Context,
    xsub_endpoint: &str,
    xpub_endpoint: &str,
) -> Result<JoinHandle<()>, zmq::Error> {
    let xsub = context.socket(zmq::XSUB)?;
    xsub.bind(xsub_endpoint)?;
    let xpub = context.socket(zmq::XPUB)?;
    xpub.bind(xpub_endpoint)?;

    Ok(thread::spawn(move || {
        // Frontend is the XSUB side publishers connect to; backend is the
        // XPUB side subscribers connect to.
        let _ = zmq::proxy(&xsub, &xpub);
    }))
}
