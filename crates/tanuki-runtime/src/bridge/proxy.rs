//! Host-side proxies for worker-owned objects.
//!
//! A proxy is a reference-counted view of a worker handle. Cloning
//! shares the count; when the last clone drops, the handle id is queued
//! and the client sends `delete` before its next request. Queueing keeps
//! `Drop` free of I/O and lock-ordering concerns.

use std::sync::{Arc, Mutex};

use tanuki_core::Handle;

use super::with_client;
use crate::value::Value;
use crate::TnkResult;

/// Handle ids whose last proxy dropped; drained by the client.
static PENDING_DELETES: Mutex<Vec<String>> = Mutex::new(Vec::new());

pub(crate) fn take_pending_deletes() -> Vec<String> {
    let mut guard = PENDING_DELETES.lock().unwrap_or_else(|e| e.into_inner());
    std::mem::take(&mut *guard)
}

#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    handle: Handle,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        let mut guard = PENDING_DELETES.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(self.handle.id.clone());
    }
}

impl Proxy {
    pub fn new(handle: Handle) -> Proxy {
        Proxy {
            inner: Arc::new(ProxyInner { handle }),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    pub fn id(&self) -> &str {
        &self.inner.handle.id
    }

    pub fn type_name(&self) -> &str {
        &self.inner.handle.type_name
    }

    /// `str` from the worker, or `repr` when the revision never sent one.
    pub fn display_text(&self) -> &str {
        self.inner.handle.display_text()
    }

    pub fn repr(&self) -> &str {
        &self.inner.handle.repr
    }

    pub fn call_method(
        &self,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> TnkResult<Value> {
        let id = self.id().to_string();
        with_client(|c| c.call_method(&id, name, args, kwargs))
    }

    pub fn get_attr(&self, name: &str) -> TnkResult<Value> {
        let id = self.id().to_string();
        with_client(|c| c.get_attribute(&id, name))
    }

    pub fn get_item(&self, key: Value) -> TnkResult<Value> {
        let id = self.id().to_string();
        with_client(|c| c.get_item(&id, key))
    }

    pub fn slice(
        &self,
        start: Option<Value>,
        stop: Option<Value>,
        step: Option<Value>,
    ) -> TnkResult<Value> {
        let id = self.id().to_string();
        with_client(|c| c.slice(&id, start, stop, step))
    }

    /// Scalar-like wrappers expose a unit-extracting `item()` method; used
    /// by numeric conversions.
    pub fn extract_scalar(&self) -> TnkResult<Value> {
        self.call_method("item", vec![], vec![])
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("id", &self.inner.handle.id)
            .field("type", &self.inner.handle.type_name)
            .finish()
    }
}
