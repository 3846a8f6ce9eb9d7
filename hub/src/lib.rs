pub mod admin;
pub mod config;
pub mod connection;
pub mod entity;
pub mod gateway;
pub mod idgen;
pub mod metrics;
pub mod protocol;
pub mod pump;
pub mod registry;
pub mod relay;
pub mod schema;

use std::sync::Arc;

use axum::Router;

pub use config::Config;
pub use relay::Hub;

/// All hub routes: the WebSocket gateway plus the HTTP admin surface.
pub fn router(hub: Arc<Hub>) -> Router {
    gateway::routes().merge(admin::routes()).with_state(hub)
}
