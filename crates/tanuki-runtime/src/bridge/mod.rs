//! Client side of the bridge protocol.
//!
//! The companion process is spawned on first use and owned globally; all
//! requests are strictly serial. Values that cannot travel inline come
//! back as [`Proxy`] handles whose lifetime drives worker-side cleanup.

mod client;
mod codec;
mod iter;
mod proxy;

#[cfg(test)]
mod bridge_tests;

pub use client::Client;
pub use iter::BridgeIter;
pub use proxy::Proxy;

use std::sync::Mutex;
use std::time::Duration;

use tanuki_core::policy;

use crate::error::{ErrorKind, TnkError};
use crate::value::Value;
use crate::TnkResult;

static CLIENT: Mutex<Option<Client>> = Mutex::new(None);

/// Runs `f` against the global client, spawning the worker on first use.
pub(crate) fn with_client<T>(f: impl FnOnce(&mut Client) -> TnkResult<T>) -> TnkResult<T> {
    let mut guard = CLIENT.lock().unwrap_or_else(|e| e.into_inner());
    if guard.is_none() {
        *guard = Some(Client::spawn()?);
    }
    f(guard.as_mut().expect("client just installed"))
}

/// Replaces the global client. Lets embedders (and tests) run against a
/// worker they supervised themselves.
pub fn install_client(client: Client) {
    let mut guard = CLIENT.lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(client);
}

/// Per-RPC timeout for the global client; on expiry the worker state is
/// undefined, so the child is killed and callers see `WorkerCrash`.
pub fn set_rpc_timeout(timeout: Option<Duration>) {
    let mut guard = CLIENT.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(client) = guard.as_mut() {
        client.set_timeout(timeout);
    }
}

/// Calls a function by dotted path (`"numpy.array"`).
///
/// The forbidden-name policy is enforced here as well as in the worker —
/// defense in depth.
pub fn call_function(
    target: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> TnkResult<Value> {
    if policy::forbidden_target(target) {
        return Err(TnkError::new(
            ErrorKind::SecurityViolation,
            format!("Forbidden function call: {}", target),
        ));
    }
    with_client(|c| c.call_function(target, args, kwargs))
}
