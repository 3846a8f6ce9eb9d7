use std::collections::HashSet;

use parking_lot::Mutex;
use serde_json::value::RawValue;

/// A live display client: its controllable surface and the controllers bound
/// to it. A reconnecting display is a new entity even if it reuses the id.
#[derive(Debug)]
pub struct Display {
    pub id: String,
    /// Command-schema document captured at registration, opaque to the hub
    /// and immutable for the connection's lifetime.
    pub command_schema: Box<RawValue>,
    subscribers: Mutex<HashSet<String>>,
}

impl Display {
    pub fn new(id: String, command_schema: Box<RawValue>) -> Self {
        Self {
            id,
            command_schema,
            subscribers: Mutex::new(HashSet::new()),
        }
    }

    /// Adds a controller to the subscriber set; returns the set size after.
    /// Re-adding an existing subscriber leaves the set unchanged.
    pub fn add_subscriber(&self, controller_id: &str) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.insert(controller_id.to_owned());
        subscribers.len()
    }

    /// Removes a controller; returns the set size after.
    pub fn remove_subscriber(&self, controller_id: &str) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.remove(controller_id);
        subscribers.len()
    }

    pub fn has_subscriber(&self, controller_id: &str) -> bool {
        self.subscribers.lock().contains(controller_id)
    }

    /// Sorted snapshot of the subscriber set.
    pub fn subscribers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.subscribers.lock().iter().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot and clear in one step, for the disconnection cascade.
    pub fn take_subscribers(&self) -> Vec<String> {
        let mut subscribers = self.subscribers.lock();
        let mut ids: Vec<String> = subscribers.drain().collect();
        ids.sort_unstable();
        ids
    }
}
