use std::sync::Arc;

use tracing::info;

use crate::{
    entity::{Controller, Display},
    metrics::METRICS,
    protocol::{Outgoing, RelayError},
    relay::Hub,
};

/// Everything a display hands over at `/ws?type=display`.
#[derive(Debug)]
pub struct DisplayRegistration {
    /// Adopted verbatim when present; minted otherwise.
    pub id: Option<String>,
    pub command_url: String,
    pub token: Option<String>,
}

impl Hub {
    /// Registers a display: token check, id resolution, schema fetch,
    /// well-formedness check, then the atomic registry insert. Any failing
    /// step aborts with its wire error and nothing is stored.
    pub async fn register_display(
        &self,
        registration: DisplayRegistration,
    ) -> Result<Arc<Display>, RelayError> {
        if self.config().token_required()
            && registration.token.as_deref() != Some(self.config().token.as_str())
        {
            return Err(RelayError::AuthenticationFailed);
        }

        // Fail fast on a taken id before paying for the fetch; the insert
        // below stays the authoritative check.
        let id = match registration.id {
            Some(id) => {
                if self.registry().has_display(&id) {
                    return Err(RelayError::DisplayIdConflict(id));
                }
                id
            }
            None => self.mint_unused_display_id(),
        };

        let schema = self
            .schema_fetcher()
            .fetch(&registration.command_url)
            .await?;

        let new_display = Arc::new(Display::new(id, schema));
        if self
            .registry()
            .insert_display(Arc::clone(&new_display))
            .is_err()
        {
            return Err(RelayError::DisplayIdConflict(new_display.id.clone()));
        }

        METRICS.record_registration("display");
        info!(display = %new_display.id, "Display registered");
        Ok(new_display)
    }

    fn mint_unused_display_id(&self) -> String {
        loop {
            let id = self.idgen().mint_display_id();
            if !self.registry().has_display(&id) {
                return id;
            }
        }
    }

    /// Auto-resubscribe: binds every controller waiting on this display's id,
    /// without controller action. Display arrival is the only trigger.
    pub fn promote_waiting_controllers(&self, display: &Display) {
        for controller in self.registry().controllers() {
            if !controller.promote_waiting(&display.id) {
                continue;
            }
            self.bind(&controller, display);
            self.send_waiting(&controller);
        }
    }

    pub fn register_controller(&self) -> Arc<Controller> {
        let controller = Arc::new(Controller::new(self.idgen().next_controller_id()));
        self.registry().insert_controller(Arc::clone(&controller));
        METRICS.record_registration("controller");
        info!(controller = %controller.id, "Controller registered");
        controller
    }

    /// Tells a freshly registered client which id it got.
    pub fn send_set_id(&self, id: &str) {
        self.deliver(&[id.to_owned()], &Outgoing::set_id(id));
    }

    /// Display departure: every live subscription flips to a waiting entry,
    /// so recovery is automatic when the display returns. Idempotent; only
    /// the removal that observes the entity runs the cascade. Returns false
    /// for an unknown id.
    pub fn unregister_display(&self, id: &str) -> bool {
        let Some(display) = self.registry().remove_display(id) else {
            return false;
        };
        if let Some(connection) = self.registry().detach_connection(id) {
            connection.cancel();
        }

        // The display is already out of the registry, so the waiting ids
        // handed out below are offline by construction.
        for controller_id in display.take_subscribers() {
            let Some(controller) = self.registry().controller(&controller_id) else {
                continue;
            };
            controller.demote_subscription(id);
            self.deliver(
                std::slice::from_ref(&controller_id),
                &Outgoing::display_disconnected(id),
            );
            self.send_waiting(&controller);
        }

        METRICS.record_disconnect("display");
        info!(display = %id, "Display unregistered");
        true
    }

    /// Controller departure: drop it from every display it was bound to.
    /// Returns false for an unknown id.
    pub fn unregister_controller(&self, id: &str) -> bool {
        let Some(controller) = self.registry().remove_controller(id) else {
            return false;
        };
        if let Some(connection) = self.registry().detach_connection(id) {
            connection.cancel();
        }

        for display_id in controller.take_subscriptions() {
            let Some(display) = self.registry().display(&display_id) else {
                continue;
            };
            let count = display.remove_subscriber(id);
            self.deliver(
                std::slice::from_ref(&display_id),
                &Outgoing::unsubscribed(count),
            );
        }

        METRICS.record_disconnect("controller");
        info!(controller = %id, "Controller unregistered");
        true
    }
}
