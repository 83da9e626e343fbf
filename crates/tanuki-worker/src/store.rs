//! Per-session object store.
//!
//! `session_id → handle_id → object`. Sessions appear lazily on first
//! request; handles live until an explicit `delete` or shutdown. No
//! sharing across sessions: resolving a handle only ever looks in the
//! requesting session.

use std::collections::HashMap;

use crate::object::Object;

#[derive(Default)]
pub struct Store {
    sessions: HashMap<String, Session>,
}

#[derive(Default)]
pub struct Session {
    objects: HashMap<String, Object>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    pub fn session(&mut self, id: &str) -> &mut Session {
        self.sessions.entry(id.to_string()).or_default()
    }

    /// Read-only view; absent sessions hold nothing.
    pub fn get(&self, session_id: &str, handle_id: &str) -> Option<&Object> {
        self.sessions.get(session_id)?.objects.get(handle_id)
    }

    pub fn get_mut(&mut self, session_id: &str, handle_id: &str) -> Option<&mut Object> {
        self.sessions.get_mut(session_id)?.objects.get_mut(handle_id)
    }

    pub fn remove(&mut self, session_id: &str, handle_id: &str) -> Option<Object> {
        self.sessions.get_mut(session_id)?.objects.remove(handle_id)
    }

    pub fn live_handles(&self, session_id: &str) -> usize {
        self.sessions
            .get(session_id)
            .map(|s| s.objects.len())
            .unwrap_or(0)
    }
}

impl Session {
    /// Stores an object under a fresh handle id.
    pub fn insert(&mut self, prefix: &str, object: Object) -> String {
        let id = format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..16]);
        self.objects.insert(id.clone(), object);
        id
    }
}
