use std::collections::HashSet;

use parking_lot::Mutex;

#[derive(Default)]
struct ControllerState {
    subscriptions: HashSet<String>,
    waiting_for: HashSet<String>,
}

/// A live controller client: the displays it is bound to and the displays it
/// is waiting on. An id never sits in both sets; every transition between
/// them happens under the single state lock.
pub struct Controller {
    pub id: String,
    state: Mutex<ControllerState>,
}

impl Controller {
    pub fn new(id: String) -> Self {
        Self {
            id,
            state: Mutex::new(ControllerState::default()),
        }
    }

    /// Binds a live display, dropping any waiting entry for the same id.
    /// Returns false if the subscription already existed.
    pub fn add_subscription(&self, display_id: &str) -> bool {
        let mut state = self.state.lock();
        state.waiting_for.remove(display_id);
        state.subscriptions.insert(display_id.to_owned())
    }

    pub fn remove_subscription(&self, display_id: &str) -> bool {
        self.state.lock().subscriptions.remove(display_id)
    }

    pub fn is_subscribed(&self, display_id: &str) -> bool {
        self.state.lock().subscriptions.contains(display_id)
    }

    pub fn add_waiting(&self, display_id: &str) -> bool {
        let mut state = self.state.lock();
        if state.subscriptions.contains(display_id) {
            return false;
        }
        state.waiting_for.insert(display_id.to_owned())
    }

    pub fn remove_waiting(&self, display_id: &str) -> bool {
        self.state.lock().waiting_for.remove(display_id)
    }

    /// Waiting → subscription, on display arrival. Returns false when the id
    /// was not being waited on.
    pub fn promote_waiting(&self, display_id: &str) -> bool {
        let mut state = self.state.lock();
        if !state.waiting_for.remove(display_id) {
            return false;
        }
        state.subscriptions.insert(display_id.to_owned());
        true
    }

    /// Subscription → waiting, on display departure. Returns false when no
    /// subscription existed.
    pub fn demote_subscription(&self, display_id: &str) -> bool {
        let mut state = self.state.lock();
        if !state.subscriptions.remove(display_id) {
            return false;
        }
        state.waiting_for.insert(display_id.to_owned());
        true
    }

    /// Replaces the waiting set wholesale (the `waiting` request). Ids that
    /// are currently subscribed are kept out of the new set.
    pub fn replace_waiting(&self, display_ids: impl IntoIterator<Item = String>) {
        let mut state = self.state.lock();
        let subscriptions = std::mem::take(&mut state.subscriptions);
        state.waiting_for = display_ids
            .into_iter()
            .filter(|id| !subscriptions.contains(id))
            .collect();
        state.subscriptions = subscriptions;
    }

    /// Sorted snapshot of the waiting set.
    pub fn waiting(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().waiting_for.iter().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Sorted snapshot of the subscription set.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().subscriptions.iter().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot and clear the subscription set, for the disconnection
    /// cascade.
    pub fn take_subscriptions(&self) -> Vec<String> {
        let mut state = self.state.lock();
        let mut ids: Vec<String> = state.subscriptions.drain().collect();
        ids.sort_unstable();
        ids
    }
}
