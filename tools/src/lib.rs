pub mod http;
pub mod observability;
pub mod toml;

use rustls::crypto::ring;

use crate::observability::setup_tracing;

/// Initializes the application with essential setup routines.
///
/// This function should be called early in the application lifecycle
/// to configure panic handling, observability (tracing) and the TLS
/// crypto provider.
///
/// # Arguments
///
/// * `name` - The name of the application (typically `env!("CARGO_PKG_NAME")`).
///
/// # Errors
///
/// Returns an error if setup fails (e.g., tracing init or rustls provider install).
///
/// # Example
///
/// ```rust
/// use tools::setup_application;
///
/// setup_application(env!("CARGO_PKG_NAME")).expect("Setup failed");
/// ```
pub fn setup_application(name: &'static str) -> anyhow::Result<()> {
    // Setup custom panic hook to handle runtime panics gracefully.
    setup_panic_hook();
    // Setup logs/tracing.
    setup_tracing(name);
    // Install rustls crypto provider (ring backend) to fix TLS init panic.
    setup_tls_provider()
}

/// Sets up a custom panic hook for the application.
///
/// This function configures Rust's panic handler to log panic information using the `tracing`
/// crate. It captures the panic message and, if available, the source location (file, line, column)
/// as structured fields. The process keeps running: a panic on one
/// connection task must never take down the others.
///
/// # Usage
/// Call this function early in `main()` to ensure all panics are logged properly.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        // If the panic has a source location, record it as structured fields.
        if let Some(location) = panic_info.location() {
            tracing::error!(
                message = %panic_info,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            );
        } else {
            tracing::error!(message = %panic_info);
        }
    }))
}

/// Installs the rustls crypto provider (ring backend).
///
/// In rustls 0.23+ the provider is not automatically determined, which panics
/// during the first TLS handshake (e.g. an HTTPS command-schema fetch) with
/// "Could not automatically determine the process-level CryptoProvider".
/// Calling this once at startup selects ring explicitly.
pub fn setup_tls_provider() -> anyhow::Result<()> {
    ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {e:?}"))
}
