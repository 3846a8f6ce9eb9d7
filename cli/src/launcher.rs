use std::sync::Arc;

use anyhow::{Context, Result};
use tools::http::http_server::{HttpServer, HttpServerConfig};

use crate::{config::Config, ui};

pub async fn start(config_path: std::path::PathBuf) -> Result<()> {
    let cfg = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::print_config_error(&config_path, &e);
            return Ok(());
        }
    };

    let hub = Arc::new(hub::Hub::from_config(cfg.hub).context("Failed to init hub")?);

    let server_config = HttpServerConfig {
        addr: cfg.general.server_addr.clone(),
        metrics_addr: cfg.general.metrics_addr.clone(),
    };

    HttpServer::from_config(server_config)
        .with_router(hub::router(hub))
        .run()
        .await
        .context("HTTP Server failed")
}
