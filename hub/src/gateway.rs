use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{
    connection::ConnectionHandle,
    entity::{ClientKind, Display},
    protocol::{Outgoing, RelayError},
    pump::{run_reader, run_writer},
    relay::{DisplayRegistration, Hub},
};

/// Query parameters accepted on `/ws`.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "type")]
    client_type: Option<String>,
    id: Option<String>,
    command_url: Option<String>,
    token: Option<String>,
}

pub fn routes() -> Router<Arc<Hub>> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/ws/inspector", get(inspector_handler))
}

async fn ws_handler(
    State(hub): State<Arc<Hub>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.max_message_size(hub.config().max_message_size)
        .on_upgrade(move |socket| handle_client(hub, query, socket))
}

async fn inspector_handler(State(hub): State<Arc<Hub>>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(hub.config().max_message_size)
        .on_upgrade(move |socket| handle_inspector(hub, socket))
}

#[derive(Debug)]
enum Registration {
    Display(DisplayRegistration),
    Controller,
}

/// Maps query parameters onto a registration request. `type` is mandatory;
/// displays also need a fetchable HTTP(S) `command_url`. Controllers always
/// get a minted id, so a supplied one is ignored.
fn resolve(query: WsQuery) -> Result<Registration, RelayError> {
    let client_type = query
        .client_type
        .ok_or_else(|| RelayError::InvalidParams("type".to_owned()))?;

    match client_type.as_str() {
        "display" => {
            let command_url = query
                .command_url
                .ok_or_else(|| RelayError::InvalidParams("command_url".to_owned()))?;
            let parsed = Url::parse(&command_url)
                .map_err(|_| RelayError::InvalidParams("command_url".to_owned()))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(RelayError::InvalidParams("command_url".to_owned()));
            }
            Ok(Registration::Display(DisplayRegistration {
                id: query.id.filter(|id| !id.is_empty()),
                command_url,
                token: query.token,
            }))
        }
        "controller" => Ok(Registration::Controller),
        other => Err(RelayError::InvalidClientType(other.to_owned())),
    }
}

async fn handle_client(hub: Arc<Hub>, query: WsQuery, socket: WebSocket) {
    match resolve(query) {
        Ok(Registration::Display(registration)) => {
            match hub.register_display(registration).await {
                Ok(display) => {
                    let id = display.id.clone();
                    serve(hub, ClientKind::Display, id, Some(display), socket).await;
                }
                Err(e) => reject(socket, &e).await,
            }
        }
        Ok(Registration::Controller) => {
            let controller = hub.register_controller();
            let id = controller.id.clone();
            serve(hub, ClientKind::Controller, id, None, socket).await;
        }
        Err(e) => reject(socket, &e).await,
    }
}

/// Serves one registered client until its connection dies: spawns the writer
/// pump, announces the id, replays pending waiting-list bindings for
/// displays, then runs the reader inline and cleans up.
async fn serve(
    hub: Arc<Hub>,
    kind: ClientKind,
    id: String,
    display: Option<Arc<Display>>,
    socket: WebSocket,
) {
    let (sink, stream) = socket.split();
    let (handle, rx) = ConnectionHandle::new(hub.config().send_queue_size);
    hub.registry().attach_connection(&id, handle.clone());

    let writer = tokio::spawn(run_writer(
        sink,
        rx,
        handle.cancellation(),
        hub.config().ping_period(),
        hub.config().write_wait(),
    ));

    // Identity first, then any bindings controllers were waiting on.
    hub.send_set_id(&id);
    if let Some(display) = &display {
        hub.promote_waiting_controllers(display);
    }
    info!(kind = %kind, client = %id, "Client connected");

    run_reader(&hub, kind, &id, stream, hub.config().pong_wait()).await;

    match kind {
        ClientKind::Display => {
            hub.unregister_display(&id);
        }
        ClientKind::Controller => {
            hub.unregister_controller(&id);
        }
        ClientKind::Inspector => {}
    }
    handle.cancel();
    let _ = writer.await;
    info!(kind = %kind, client = %id, "Client disconnected");
}

/// Inspectors skip registration semantics entirely and attach straight to
/// the fan-out pool.
async fn handle_inspector(hub: Arc<Hub>, socket: WebSocket) {
    let (sink, stream) = socket.split();
    let (handle, rx) = ConnectionHandle::new(hub.config().send_queue_size);
    let seq = hub.attach_inspector(handle.clone());

    let writer = tokio::spawn(run_writer(
        sink,
        rx,
        handle.cancellation(),
        hub.config().ping_period(),
        hub.config().write_wait(),
    ));

    let id = format!("inspector-{seq}");
    info!(client = %id, "Inspector connected");

    run_reader(&hub, ClientKind::Inspector, &id, stream, hub.config().pong_wait()).await;

    hub.detach_inspector(seq);
    handle.cancel();
    let _ = writer.await;
    info!(client = %id, "Inspector disconnected");
}

/// Registration failures are sent once on the raw socket, then the
/// connection is closed.
async fn reject(mut socket: WebSocket, err: &RelayError) {
    debug!(code = err.code(), error = %err, "Rejecting connection");
    if let Ok(frame) = serde_json::to_string(&Outgoing::error(err)) {
        let _ = socket.send(Message::Text(frame.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}
