use crate::protocol::{ServerHandle, ServerState};
use std::collections::HashMap;

/// Registry of managed servers and their last known state.
///
/// Handles are kept in insertion order for display. Every handle has exactly
/// one state entry and vice versa; both collections are only changed
/// together.
#[derive(Debug, Default)]
pub struct ServerModel {
    handles: Vec<ServerHandle>,
    states: HashMap<String, ServerState>,
}

impl ServerModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a server with its initial state.
    ///
    /// Returns `false` without touching anything if the id is already
    /// registered.
    pub fn insert(&mut self, handle: ServerHandle) -> bool {
        if self.states.contains_key(&handle.id) {
            return false;
        }
        self.states
            .insert(handle.id.clone(), ServerState::initial(handle.clone()));
        self.handles.push(handle);
        true
    }

    /// Replaces the state of a registered server with `state`.
    ///
    /// Returns `false` if the server is not registered.
    pub fn update(&mut self, state: ServerState) -> bool {
        match self.states.get_mut(&state.server.id) {
            Some(current) => {
                *current = state;
                true
            }
            None => false,
        }
    }

    /// Unregisters a server, returning its last state.
    pub fn remove(&mut self, server_id: &str) -> Option<ServerState> {
        let state = self.states.remove(server_id)?;
        self.handles.retain(|handle| handle.id != server_id);
        Some(state)
    }

    pub fn contains(&self, server_id: &str) -> bool {
        self.states.contains_key(server_id)
    }

    pub fn handle(&self, server_id: &str) -> Option<&ServerHandle> {
        self.handles.iter().find(|handle| handle.id == server_id)
    }

    pub fn state(&self, server_id: &str) -> Option<&ServerState> {
        self.states.get(server_id)
    }

    /// Registered handles in insertion order.
    pub fn handles(&self) -> &[ServerHandle] {
        &self.handles
    }

    pub fn server_ids(&self) -> Vec<String> {
        self.handles.iter().map(|handle| handle.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether the handle list and the state map hold the same ids.
    pub fn is_consistent(&self) -> bool {
        self.handles.len() == self.states.len()
            && self
                .handles
                .iter()
                .all(|handle| self.states.contains_key(&handle.id))
    }
}
