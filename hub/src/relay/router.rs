use serde_json::value::RawValue;
use tracing::debug;

use crate::{
    entity::{ClientKind, Controller, Display},
    protocol::{ClientMessage, Outgoing, RelayError},
    relay::Hub,
};

impl Hub {
    /// Decodes and applies one text frame. Runs inline on the sender's
    /// reader task, so a misbehaving client only ever slows itself.
    pub fn handle_frame(&self, kind: ClientKind, sender_id: &str, text: &str) {
        let result = match ClientMessage::parse(text) {
            Ok(message) => self.dispatch(kind, sender_id, message),
            Err(e) => Err(e),
        };

        // The offending message is dropped; the sender gets one error
        // envelope and the connection stays open.
        if let Err(e) = result {
            debug!(client = %sender_id, code = e.code(), error = %e, "Dropping message");
            self.send_error(sender_id, &e);
        }
    }

    fn dispatch(
        &self,
        kind: ClientKind,
        sender_id: &str,
        message: ClientMessage<'_>,
    ) -> Result<(), RelayError> {
        match (kind, message) {
            (ClientKind::Controller, message) => {
                // A lookup miss means the controller is mid-unregistration;
                // nothing is left to answer.
                let Some(controller) = self.registry().controller(sender_id) else {
                    return Ok(());
                };
                match message {
                    ClientMessage::Subscribe { display_ids } => {
                        self.subscribe(&controller, display_ids);
                        Ok(())
                    }
                    ClientMessage::Unsubscribe { display_ids } => {
                        self.unsubscribe(&controller, display_ids);
                        Ok(())
                    }
                    ClientMessage::Command { to, payload } => self.command(&controller, to, payload),
                    ClientMessage::Waiting { display_ids } => {
                        self.replace_waiting(&controller, display_ids);
                        Ok(())
                    }
                    ClientMessage::Status { .. } => Err(RelayError::InvalidMessage(
                        "status is a display message".to_owned(),
                    )),
                }
            }
            (ClientKind::Display, ClientMessage::Status { payload }) => {
                let Some(display) = self.registry().display(sender_id) else {
                    return Ok(());
                };
                self.status(&display, payload);
                Ok(())
            }
            (ClientKind::Display, _) => Err(RelayError::InvalidMessage(
                "displays may only send status".to_owned(),
            )),
            // Inspector frames are filtered out by the reader pump already.
            (ClientKind::Inspector, _) => Ok(()),
        }
    }

    fn subscribe(&self, controller: &Controller, display_ids: Vec<String>) {
        for display_id in display_ids {
            match self.registry().display(&display_id) {
                Some(display) => self.bind(controller, &display),
                None => {
                    controller.add_waiting(&display_id);
                }
            }
        }
        self.send_waiting(controller);
    }

    /// One live binding: both sides updated (controller first, then the
    /// display under its own lock), schema and subscriber count announced.
    /// Safe to repeat; a duplicate bind changes no state but re-sends the
    /// schema.
    pub(crate) fn bind(&self, controller: &Controller, display: &Display) {
        controller.add_subscription(&display.id);
        let count = display.add_subscriber(&controller.id);
        self.deliver(
            std::slice::from_ref(&controller.id),
            &Outgoing::command_list(&display.id, display.command_schema.clone()),
        );
        self.deliver(
            std::slice::from_ref(&display.id),
            &Outgoing::subscribed(count),
        );
    }

    fn unsubscribe(&self, controller: &Controller, display_ids: Vec<String>) {
        for display_id in &display_ids {
            if controller.remove_subscription(display_id) {
                if let Some(display) = self.registry().display(display_id) {
                    let count = display.remove_subscriber(&controller.id);
                    self.deliver(
                        std::slice::from_ref(&display.id),
                        &Outgoing::unsubscribed(count),
                    );
                }
            }
            controller.remove_waiting(display_id);
        }
        self.send_waiting(controller);
    }

    fn command(
        &self,
        controller: &Controller,
        to: String,
        payload: &RawValue,
    ) -> Result<(), RelayError> {
        if !self.registry().has_display(&to) {
            return Err(RelayError::DisplayNotFound(to));
        }
        if !controller.is_subscribed(&to) {
            return Err(RelayError::NotSubscribed(to));
        }
        let message = Outgoing::command(&controller.id, payload);
        self.deliver(&[to], &message);
        Ok(())
    }

    /// The `waiting` request replaces the waiting set with the offline
    /// subset of the requested ids. Online ids are filtered out, never
    /// auto-subscribed; display arrival is the sole auto-subscribe trigger.
    fn replace_waiting(&self, controller: &Controller, display_ids: Vec<String>) {
        let offline = display_ids
            .into_iter()
            .filter(|id| !self.registry().has_display(id));
        controller.replace_waiting(offline);
        self.send_waiting(controller);
    }

    /// Fans one status report out to every current subscriber.
    fn status(&self, display: &Display, payload: &RawValue) {
        let subscribers = display.subscribers();
        if subscribers.is_empty() {
            return;
        }
        self.deliver(&subscribers, &Outgoing::status(&display.id, payload));
    }

    pub(crate) fn send_waiting(&self, controller: &Controller) {
        self.deliver(
            std::slice::from_ref(&controller.id),
            &Outgoing::waiting(&controller.waiting()),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, value::RawValue};
    use tokio::sync::mpsc;

    use super::*;
    use crate::{Config, connection::ConnectionHandle, entity::Controller};

    fn hub() -> Hub {
        Hub::from_config(Config::default()).unwrap()
    }

    fn connect_controller(hub: &Hub) -> (Arc<Controller>, mpsc::Receiver<String>) {
        let controller = hub.register_controller();
        let (handle, rx) = ConnectionHandle::new(64);
        hub.registry().attach_connection(&controller.id, handle);
        (controller, rx)
    }

    fn connect_display(
        hub: &Hub,
        id: &str,
        schema: &str,
    ) -> (Arc<Display>, mpsc::Receiver<String>) {
        let schema = RawValue::from_string(schema.to_owned()).unwrap();
        let display = Arc::new(Display::new(id.to_owned(), schema));
        hub.registry().insert_display(Arc::clone(&display)).unwrap();
        let (handle, rx) = ConnectionHandle::new(64);
        hub.registry().attach_connection(id, handle);
        (display, rx)
    }

    fn next(rx: &mut mpsc::Receiver<String>) -> Value {
        serde_json::from_str(&rx.try_recv().expect("expected a frame")).unwrap()
    }

    fn assert_empty(rx: &mut mpsc::Receiver<String>) {
        assert!(rx.try_recv().is_err(), "expected no more frames");
    }

    #[tokio::test]
    async fn test_subscribe_happy_path() {
        let hub = hub();
        let schema = r#"[{"name":"set_volume","type":"number"}]"#;
        let (_display, mut display_rx) = connect_display(&hub, "tv", schema);
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"subscribe","payload":{"display_ids":["tv"]}}"#,
        );

        let command_list = next(&mut controller_rx);
        assert_eq!(command_list["type"], "command_list");
        assert_eq!(command_list["from"], "tv");
        assert_eq!(
            command_list["payload"],
            serde_json::json!([{"name":"set_volume","type":"number"}])
        );

        let waiting = next(&mut controller_rx);
        assert_eq!(waiting["type"], "waiting");
        assert_eq!(waiting["payload"], serde_json::json!([]));

        let subscribed = next(&mut display_rx);
        assert_eq!(subscribed["type"], "subscribed");
        assert_eq!(subscribed["from"], "server");
        assert_eq!(subscribed["payload"]["count"], 1);
    }

    #[tokio::test]
    async fn test_subscribe_offline_goes_to_waiting() {
        let hub = hub();
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"subscribe","payload":{"display_ids":["display-X"]}}"#,
        );

        let waiting = next(&mut controller_rx);
        assert_eq!(waiting["type"], "waiting");
        assert_eq!(waiting["payload"], serde_json::json!(["display-X"]));
        assert_eq!(controller.waiting(), ["display-X"]);
    }

    #[tokio::test]
    async fn test_subscribe_twice_is_idempotent_but_resends_schema() {
        let hub = hub();
        let (display, mut display_rx) = connect_display(&hub, "tv", "[]");
        let (controller, mut controller_rx) = connect_controller(&hub);

        let frame = r#"{"type":"subscribe","payload":{"display_ids":["tv"]}}"#;
        hub.handle_frame(ClientKind::Controller, &controller.id, frame);
        hub.handle_frame(ClientKind::Controller, &controller.id, frame);

        assert_eq!(controller.subscriptions(), ["tv"]);
        assert_eq!(display.subscribers(), [controller.id.clone()]);

        // Both rounds: command_list then waiting.
        for _ in 0..2 {
            assert_eq!(next(&mut controller_rx)["type"], "command_list");
            assert_eq!(next(&mut controller_rx)["type"], "waiting");
        }
        // The count stays at 1 on the repeat.
        assert_eq!(next(&mut display_rx)["payload"]["count"], 1);
        assert_eq!(next(&mut display_rx)["payload"]["count"], 1);
    }

    #[tokio::test]
    async fn test_command_forwarding() {
        let hub = hub();
        let (_display, mut display_rx) = connect_display(&hub, "tv", "[]");
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"subscribe","payload":{"display_ids":["tv"]}}"#,
        );
        controller_rx.try_recv().unwrap();
        controller_rx.try_recv().unwrap();
        display_rx.try_recv().unwrap();

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"command","to":"tv","payload":{"name":"set_volume","args":{"level":75}}}"#,
        );

        let command = next(&mut display_rx);
        assert_eq!(command["type"], "command");
        assert_eq!(command["from"], controller.id);
        assert_eq!(
            command["payload"],
            serde_json::json!({"name":"set_volume","args":{"level":75}})
        );
    }

    #[tokio::test]
    async fn test_unauthorized_command_yields_3004() {
        let hub = hub();
        let (_display, mut display_rx) = connect_display(&hub, "tv", "[]");
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"command","to":"tv","payload":{"name":"x"}}"#,
        );

        let error = next(&mut controller_rx);
        assert_eq!(error["type"], "error");
        assert_eq!(error["payload"]["code"], 3004);
        assert_empty(&mut controller_rx);
        assert_empty(&mut display_rx);
    }

    #[tokio::test]
    async fn test_command_to_unknown_display_yields_3001() {
        let hub = hub();
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"command","to":"ghost","payload":{"name":"x"}}"#,
        );

        assert_eq!(next(&mut controller_rx)["payload"]["code"], 3001);
    }

    #[tokio::test]
    async fn test_status_fans_out_to_all_subscribers() {
        let hub = hub();
        let (display, _display_rx) = connect_display(&hub, "tv", "[]");
        let (c1, mut rx1) = connect_controller(&hub);
        let (c2, mut rx2) = connect_controller(&hub);

        let frame = r#"{"type":"subscribe","payload":{"display_ids":["tv"]}}"#;
        hub.handle_frame(ClientKind::Controller, &c1.id, frame);
        hub.handle_frame(ClientKind::Controller, &c2.id, frame);
        rx1.try_recv().unwrap();
        rx1.try_recv().unwrap();
        rx2.try_recv().unwrap();
        rx2.try_recv().unwrap();

        hub.handle_frame(
            ClientKind::Display,
            &display.id,
            r#"{"type":"status","payload":{"playback":"playing"}}"#,
        );

        for rx in [&mut rx1, &mut rx2] {
            let status = next(rx);
            assert_eq!(status["type"], "status");
            assert_eq!(status["from"], "tv");
            assert_eq!(status["payload"], serde_json::json!({"playback":"playing"}));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_both_sides() {
        let hub = hub();
        let (display, mut display_rx) = connect_display(&hub, "tv", "[]");
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"subscribe","payload":{"display_ids":["tv"]}}"#,
        );
        controller_rx.try_recv().unwrap();
        controller_rx.try_recv().unwrap();
        display_rx.try_recv().unwrap();

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"unsubscribe","payload":{"display_ids":["tv"]}}"#,
        );

        let unsubscribed = next(&mut display_rx);
        assert_eq!(unsubscribed["type"], "unsubscribed");
        assert_eq!(unsubscribed["payload"]["count"], 0);

        let waiting = next(&mut controller_rx);
        assert_eq!(waiting["payload"], serde_json::json!([]));

        assert!(controller.subscriptions().is_empty());
        assert!(display.subscribers().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_id_is_noop_besides_echo() {
        let hub = hub();
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"unsubscribe","payload":{"display_ids":["never-seen"]}}"#,
        );

        let waiting = next(&mut controller_rx);
        assert_eq!(waiting["type"], "waiting");
        assert_eq!(waiting["payload"], serde_json::json!([]));
        assert_empty(&mut controller_rx);
    }

    #[tokio::test]
    async fn test_waiting_request_filters_online_ids() {
        let hub = hub();
        let (_display, _display_rx) = connect_display(&hub, "tv-online", "[]");
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"waiting","payload":["tv-online","tv-offline"]}"#,
        );

        let waiting = next(&mut controller_rx);
        assert_eq!(waiting["payload"], serde_json::json!(["tv-offline"]));
        // Online ids are dropped, not auto-subscribed.
        assert!(controller.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_yields_4001() {
        let hub = hub();
        let (controller, mut controller_rx) = connect_controller(&hub);

        hub.handle_frame(ClientKind::Controller, &controller.id, r#"{"type":"reboot"}"#);

        assert_eq!(next(&mut controller_rx)["payload"]["code"], 4001);
    }

    #[tokio::test]
    async fn test_display_cannot_subscribe() {
        let hub = hub();
        let (display, mut display_rx) = connect_display(&hub, "tv", "[]");

        hub.handle_frame(
            ClientKind::Display,
            &display.id,
            r#"{"type":"subscribe","payload":{"display_ids":["other"]}}"#,
        );

        assert_eq!(next(&mut display_rx)["payload"]["code"], 4001);
    }

    #[tokio::test]
    async fn test_outbound_envelopes_are_mirrored_to_inspectors() {
        let hub = hub();
        let (inspector, mut inspector_rx) = ConnectionHandle::new(64);
        hub.attach_inspector(inspector);

        let (display, _display_rx) = connect_display(&hub, "tv", "[]");
        let (controller, _controller_rx) = connect_controller(&hub);

        hub.handle_frame(
            ClientKind::Controller,
            &controller.id,
            r#"{"type":"subscribe","payload":{"display_ids":["tv"]}}"#,
        );
        hub.handle_frame(
            ClientKind::Display,
            &display.id,
            r#"{"type":"status","payload":{"on":true}}"#,
        );

        // command_list, subscribed, waiting, status: four mirrored envelopes.
        let mut kinds = Vec::new();
        while let Ok(frame) = inspector_rx.try_recv() {
            let value: Value = serde_json::from_str(&frame).unwrap();
            assert!(value["timestamp"].is_string());
            kinds.push(value["original_message"]["type"].as_str().unwrap().to_owned());
        }
        assert_eq!(kinds, ["command_list", "subscribed", "waiting", "status"]);
    }
}
