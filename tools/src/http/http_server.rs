use std::{future::ready, net::SocketAddr};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, signal};
use tracing::info;

/// Listen addresses for the relay and metrics listeners.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub addr: String,
    pub metrics_addr: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_owned(),
            metrics_addr: "127.0.0.1:9007".to_owned(),
        }
    }
}

/// Serves the relay routes on `addr` and a Prometheus scrape endpoint on
/// `metrics_addr`. Shutdown is just closing the listeners: established
/// WebSocket connections then drain through their own transport deadlines.
pub struct HttpServer {
    config: HttpServerConfig,
    router: Option<Router>,
}

impl HttpServer {
    pub fn from_config(config: HttpServerConfig) -> Self {
        Self {
            config,
            router: None,
        }
    }

    /// Mounts application routes next to the default readiness/liveness pair.
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub async fn run(self) -> Result<()> {
        let relay_routes = self.router.unwrap_or_default().merge(health_routes());

        tokio::try_join!(
            serve("relay", &self.config.addr, relay_routes),
            serve("metrics", &self.config.metrics_addr, metrics_routes()),
        )?;

        Ok(())
    }
}

async fn serve(label: &'static str, addr: &str, router: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {label} listener on {addr}"))?;

    info!("Listening for {label} traffic on {addr}");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .with_context(|| format!("{label} server on {addr} failed"))
}

/// SIGTERM is how the platform asks the relay to stop; Ctrl+C covers local
/// runs.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}

fn health_routes() -> Router {
    Router::new()
        .route("/readiness", get(|| async { "OK" }))
        .route("/liveness", get(|| async { "OK" }))
}

fn metrics_routes() -> Router {
    let handle = install_prometheus_recorder();
    Router::new().route("/metrics", get(move || ready(handle.render())))
}

fn install_prometheus_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}
