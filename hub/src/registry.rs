use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    connection::ConnectionHandle,
    entity::{Controller, Display},
};

/// Id-keyed concurrent maps for live entities and their connections, split by
/// client kind. Entries are snapshot-consistent individually; no global
/// snapshot is taken, so iteration never blocks on a slow client.
pub struct Registry {
    displays: DashMap<String, Arc<Display>>,
    controllers: DashMap<String, Arc<Controller>>,
    connections: DashMap<String, ConnectionHandle>,
    inspectors: DashMap<u64, ConnectionHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            displays: DashMap::new(),
            controllers: DashMap::new(),
            connections: DashMap::new(),
            inspectors: DashMap::new(),
        }
    }

    pub fn display(&self, id: &str) -> Option<Arc<Display>> {
        self.displays.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn has_display(&self, id: &str) -> bool {
        self.displays.contains_key(id)
    }

    /// Atomically claims the display's id slot. Err when a live display
    /// already owns the id.
    pub fn insert_display(&self, display: Arc<Display>) -> Result<(), Arc<Display>> {
        match self.displays.entry(display.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(display),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(display);
                Ok(())
            }
        }
    }

    pub fn remove_display(&self, id: &str) -> Option<Arc<Display>> {
        self.displays.remove(id).map(|(_, display)| display)
    }

    pub fn controller(&self, id: &str) -> Option<Arc<Controller>> {
        self.controllers
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert_controller(&self, controller: Arc<Controller>) {
        self.controllers.insert(controller.id.clone(), controller);
    }

    pub fn remove_controller(&self, id: &str) -> Option<Arc<Controller>> {
        self.controllers.remove(id).map(|(_, controller)| controller)
    }

    /// Snapshot of all live displays.
    pub fn displays(&self) -> Vec<Arc<Display>> {
        self.displays
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Snapshot of all live controllers.
    pub fn controllers(&self) -> Vec<Arc<Controller>> {
        self.controllers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn connection(&self, id: &str) -> Option<ConnectionHandle> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    pub fn attach_connection(&self, id: &str, handle: ConnectionHandle) {
        self.connections.insert(id.to_owned(), handle);
    }

    pub fn detach_connection(&self, id: &str) -> Option<ConnectionHandle> {
        self.connections.remove(id).map(|(_, handle)| handle)
    }

    pub fn attach_inspector(&self, seq: u64, handle: ConnectionHandle) {
        self.inspectors.insert(seq, handle);
    }

    pub fn detach_inspector(&self, seq: u64) -> Option<ConnectionHandle> {
        self.inspectors.remove(&seq).map(|(_, handle)| handle)
    }

    /// Snapshot of inspector write handles for fan-out.
    pub fn inspectors(&self) -> Vec<ConnectionHandle> {
        self.inspectors
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
