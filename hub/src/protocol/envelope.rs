use serde::{Deserialize, Serialize};
use serde_json::value::{RawValue, to_raw_value};

use crate::protocol::error::RelayError;

/// Logical source name used for envelopes the server originates itself.
pub const SERVER_SOURCE: &str = "server";

/// Client → server envelope as it arrives on the wire. The payload stays raw
/// until the router knows what the type string asks for.
#[derive(Debug, Deserialize)]
pub struct Incoming<'a> {
    #[serde(rename = "type")]
    pub kind: String,
    pub to: Option<String>,
    #[serde(borrow)]
    pub payload: Option<&'a RawValue>,
}

/// Server → client envelope. `from` names the logical source: "server", a
/// display id, or a controller id. Opaque payloads keep their exact wire
/// bytes through `RawValue`.
#[derive(Debug, Serialize)]
pub struct Outgoing {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub payload: Box<RawValue>,
}

/// Payload of `subscribe` / `unsubscribe`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DisplayIds {
    pub display_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AssignedId<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct SubscriberCount {
    count: usize,
}

#[derive(Debug, Serialize)]
struct DisplayDisconnected<'a> {
    display_id: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub message: String,
}

/// Mirror of one outbound envelope, shipped to inspector connections.
#[derive(Debug, Serialize)]
pub struct InspectorEnvelope<'a> {
    pub source: &'a str,
    pub targets: &'a [String],
    pub timestamp: String,
    pub original_message: &'a Outgoing,
}

// Serializing our own payload structs cannot fail: they contain only strings,
// integers and vectors of strings.
fn raw<T: Serialize>(value: &T) -> Box<RawValue> {
    to_raw_value(value).expect("payload serialization")
}

impl Outgoing {
    pub fn set_id(id: &str) -> Self {
        Self {
            kind: "set_id",
            from: Some(SERVER_SOURCE.to_owned()),
            payload: raw(&AssignedId { id }),
        }
    }

    /// The schema document rides through byte-exact, as fetched at
    /// registration.
    pub fn command_list(display_id: &str, schema: Box<RawValue>) -> Self {
        Self {
            kind: "command_list",
            from: Some(display_id.to_owned()),
            payload: schema,
        }
    }

    pub fn subscribed(count: usize) -> Self {
        Self {
            kind: "subscribed",
            from: Some(SERVER_SOURCE.to_owned()),
            payload: raw(&SubscriberCount { count }),
        }
    }

    pub fn unsubscribed(count: usize) -> Self {
        Self {
            kind: "unsubscribed",
            from: Some(SERVER_SOURCE.to_owned()),
            payload: raw(&SubscriberCount { count }),
        }
    }

    pub fn waiting(display_ids: &[String]) -> Self {
        Self {
            kind: "waiting",
            from: Some(SERVER_SOURCE.to_owned()),
            payload: raw(&display_ids),
        }
    }

    pub fn display_disconnected(display_id: &str) -> Self {
        Self {
            kind: "display_disconnected",
            from: Some(SERVER_SOURCE.to_owned()),
            payload: raw(&DisplayDisconnected { display_id }),
        }
    }

    pub fn command(controller_id: &str, payload: &RawValue) -> Self {
        Self {
            kind: "command",
            from: Some(controller_id.to_owned()),
            payload: payload.to_owned(),
        }
    }

    pub fn status(display_id: &str, payload: &RawValue) -> Self {
        Self {
            kind: "status",
            from: Some(display_id.to_owned()),
            payload: payload.to_owned(),
        }
    }

    pub fn error(err: &RelayError) -> Self {
        Self {
            kind: "error",
            from: Some(SERVER_SOURCE.to_owned()),
            payload: raw(&ErrorPayload {
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }

    /// Logical source of this envelope for inspector tagging.
    pub fn source(&self) -> &str {
        self.from.as_deref().unwrap_or(SERVER_SOURCE)
    }
}

/// One decoded client message, ready for the router.
#[derive(Debug)]
pub enum ClientMessage<'a> {
    Subscribe { display_ids: Vec<String> },
    Unsubscribe { display_ids: Vec<String> },
    Command { to: String, payload: &'a RawValue },
    Waiting { display_ids: Vec<String> },
    Status { payload: &'a RawValue },
}

impl<'a> ClientMessage<'a> {
    /// Decodes one text frame. Unknown types, malformed JSON and missing
    /// required fields all map onto error 4001.
    pub fn parse(text: &'a str) -> Result<Self, RelayError> {
        let envelope: Incoming<'a> = serde_json::from_str(text)
            .map_err(|e| RelayError::InvalidMessage(e.to_string()))?;

        let payload = |field: &str| {
            envelope
                .payload
                .ok_or_else(|| RelayError::InvalidMessage(format!("missing field: {field}")))
        };

        match envelope.kind.as_str() {
            "subscribe" => {
                let ids: DisplayIds = serde_json::from_str(payload("payload")?.get())
                    .map_err(|e| RelayError::InvalidMessage(e.to_string()))?;
                Ok(Self::Subscribe {
                    display_ids: ids.display_ids,
                })
            }
            "unsubscribe" => {
                let ids: DisplayIds = serde_json::from_str(payload("payload")?.get())
                    .map_err(|e| RelayError::InvalidMessage(e.to_string()))?;
                Ok(Self::Unsubscribe {
                    display_ids: ids.display_ids,
                })
            }
            "command" => {
                let to = envelope
                    .to
                    .ok_or_else(|| RelayError::InvalidMessage("missing field: to".to_owned()))?;
                Ok(Self::Command {
                    to,
                    payload: payload("payload")?,
                })
            }
            "waiting" => {
                let display_ids: Vec<String> = serde_json::from_str(payload("payload")?.get())
                    .map_err(|e| RelayError::InvalidMessage(e.to_string()))?;
                Ok(Self::Waiting { display_ids })
            }
            "status" => Ok(Self::Status {
                payload: payload("payload")?,
            }),
            other => Err(RelayError::InvalidMessage(format!("unknown type: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_parse_subscribe() {
        let msg =
            ClientMessage::parse(r#"{"type":"subscribe","payload":{"display_ids":["a","b"]}}"#)
                .unwrap();
        match msg {
            ClientMessage::Subscribe { display_ids } => assert_eq!(display_ids, ["a", "b"]),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_command_preserves_payload_bytes() {
        let text = r#"{"type":"command","to":"tv","payload":{"name":"set_volume","args":{"level":75}}}"#;
        let msg = ClientMessage::parse(text).unwrap();
        match msg {
            ClientMessage::Command { to, payload } => {
                assert_eq!(to, "tv");
                assert_eq!(
                    payload.get(),
                    r#"{"name":"set_volume","args":{"level":75}}"#
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_command_without_to_is_rejected() {
        let err = ClientMessage::parse(r#"{"type":"command","payload":{"name":"x"}}"#).unwrap_err();
        assert_eq!(err.code(), 4001);
    }

    #[test]
    fn test_parse_waiting_raw_array() {
        let msg = ClientMessage::parse(r#"{"type":"waiting","payload":["tv-1","tv-2"]}"#).unwrap();
        match msg {
            ClientMessage::Waiting { display_ids } => assert_eq!(display_ids, ["tv-1", "tv-2"]),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = ClientMessage::parse(r#"{"type":"reboot","payload":{}}"#).unwrap_err();
        assert_eq!(err.code(), 4001);
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = ClientMessage::parse("{not json").unwrap_err();
        assert_eq!(err.code(), 4001);
    }

    #[test]
    fn test_parse_missing_payload() {
        let err = ClientMessage::parse(r#"{"type":"status"}"#).unwrap_err();
        assert_eq!(err.code(), 4001);
    }

    #[test]
    fn test_outgoing_omits_absent_from() {
        let env = Outgoing {
            kind: "status",
            from: None,
            payload: to_raw_value(&serde_json::json!({"ok": true})).unwrap(),
        };
        let text = serde_json::to_string(&env).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("from").is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let env = Outgoing::error(&RelayError::NotSubscribed("tv".into()));
        let value: Value = serde_json::to_string(&env)
            .and_then(|s| serde_json::from_str(&s))
            .unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["from"], "server");
        assert_eq!(value["payload"]["code"], 3004);
    }

    #[test]
    fn test_waiting_envelope_payload_is_array() {
        let env = Outgoing::waiting(&["tv-1".to_owned()]);
        let value: Value = serde_json::to_string(&env)
            .and_then(|s| serde_json::from_str(&s))
            .unwrap();
        assert_eq!(value["payload"], serde_json::json!(["tv-1"]));
    }

    #[test]
    fn test_inspector_envelope_nests_original() {
        let original = Outgoing::subscribed(2);
        let targets = vec!["tv-1".to_owned()];
        let mirror = InspectorEnvelope {
            source: SERVER_SOURCE,
            targets: &targets,
            timestamp: "2026-01-01T00:00:00Z".to_owned(),
            original_message: &original,
        };
        let value: Value = serde_json::to_string(&mirror)
            .and_then(|s| serde_json::from_str(&s))
            .unwrap();
        assert_eq!(value["source"], "server");
        assert_eq!(value["targets"], serde_json::json!(["tv-1"]));
        assert_eq!(value["original_message"]["type"], "subscribed");
        assert_eq!(value["original_message"]["payload"]["count"], 2);
    }
}
