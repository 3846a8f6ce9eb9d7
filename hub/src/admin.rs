use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Serialize;
use tracing::info;

use crate::relay::Hub;

/// HTTP admin surface: enumerate live clients and force-delete them.
pub fn routes() -> Router<Arc<Hub>> {
    Router::new()
        .route("/api/connections", get(list_connections))
        .route("/api/displays/{id}", delete(delete_display))
        .route("/api/controllers/{id}", delete(delete_controller))
}

#[derive(Debug, Serialize)]
struct ConnectionsResponse {
    displays: Vec<DisplayInfo>,
    controllers: Vec<ControllerInfo>,
}

#[derive(Debug, Serialize)]
struct DisplayInfo {
    id: String,
    subscribers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ControllerInfo {
    id: String,
    subscriptions: Vec<String>,
}

/// Lists and member arrays come out sorted so the output is stable across
/// calls.
async fn list_connections(State(hub): State<Arc<Hub>>) -> Json<ConnectionsResponse> {
    let mut displays: Vec<DisplayInfo> = hub
        .registry()
        .displays()
        .into_iter()
        .map(|display| DisplayInfo {
            id: display.id.clone(),
            subscribers: display.subscribers(),
        })
        .collect();
    displays.sort_unstable_by(|a, b| a.id.cmp(&b.id));

    let mut controllers: Vec<ControllerInfo> = hub
        .registry()
        .controllers()
        .into_iter()
        .map(|controller| ControllerInfo {
            id: controller.id.clone(),
            subscriptions: controller.subscriptions(),
        })
        .collect();
    controllers.sort_unstable_by(|a, b| a.id.cmp(&b.id));

    Json(ConnectionsResponse {
        displays,
        controllers,
    })
}

/// Force-delete runs the same cascade as a disconnect and additionally
/// closes the victim's connection.
async fn delete_display(State(hub): State<Arc<Hub>>, Path(id): Path<String>) -> StatusCode {
    if hub.unregister_display(&id) {
        info!(display = %id, "Display deleted by admin");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn delete_controller(State(hub): State<Arc<Hub>>, Path(id): Path<String>) -> StatusCode {
    if hub.unregister_controller(&id) {
        info!(controller = %id, "Controller deleted by admin");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
