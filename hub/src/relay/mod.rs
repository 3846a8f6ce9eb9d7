mod lifecycle;
mod router;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};
use tracing::{error, warn};

pub use lifecycle::DisplayRegistration;

use crate::{
    config::Config,
    connection::ConnectionHandle,
    idgen::IdGenerator,
    metrics::METRICS,
    protocol::{InspectorEnvelope, Outgoing, RelayError},
    registry::Registry,
    schema::SchemaFetcher,
};

/// The process-wide relay hub: registry, id generator and schema fetcher
/// behind one handle. Initialized once at startup; all connection tasks share
/// it through an `Arc`.
pub struct Hub {
    config: Config,
    registry: Registry,
    idgen: IdGenerator,
    schema: SchemaFetcher,
    inspector_seq: AtomicU64,
}

impl Hub {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let schema = SchemaFetcher::new(config.schema_fetch_timeout())?;
        Ok(Self {
            config,
            registry: Registry::new(),
            idgen: IdGenerator::new(),
            schema,
            inspector_seq: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn schema_fetcher(&self) -> &SchemaFetcher {
        &self.schema
    }

    pub(crate) fn idgen(&self) -> &IdGenerator {
        &self.idgen
    }

    /// Enqueues one envelope to every target's writer and mirrors it to the
    /// inspector pool. Enqueues never block; a full queue drops the envelope
    /// for that target only.
    pub(crate) fn deliver(&self, targets: &[String], message: &Outgoing) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = ?e, kind = message.kind, "Failed to serialize envelope");
                return;
            }
        };

        for target in targets {
            let Some(connection) = self.registry.connection(target) else {
                continue;
            };
            if connection.try_send(frame.clone()) {
                METRICS.record_envelope(message.kind);
            } else {
                METRICS.record_dropped_envelope(message.kind);
                warn!(target = %target, kind = message.kind, "Send queue full, dropping envelope");
            }
        }

        self.mirror(targets, message);
    }

    /// Post-registration errors ride the normal queue; the connection stays
    /// open.
    pub(crate) fn send_error(&self, target: &str, err: &RelayError) {
        self.deliver(&[target.to_owned()], &Outgoing::error(err));
    }

    fn mirror(&self, targets: &[String], message: &Outgoing) {
        let inspectors = self.registry.inspectors();
        if inspectors.is_empty() {
            return;
        }

        let envelope = InspectorEnvelope {
            source: message.source(),
            targets,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            original_message: message,
        };
        let frame = match serde_json::to_string(&envelope) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = ?e, "Failed to serialize inspector envelope");
                return;
            }
        };

        for inspector in inspectors {
            // A full inspector queue never delays relay traffic.
            if !inspector.try_send(frame.clone()) {
                METRICS.record_dropped_envelope("inspector");
            }
        }
    }

    pub fn attach_inspector(&self, handle: ConnectionHandle) -> u64 {
        let seq = self.inspector_seq.fetch_add(1, Ordering::Relaxed);
        self.registry.attach_inspector(seq, handle);
        METRICS.record_registration("inspector");
        seq
    }

    pub fn detach_inspector(&self, seq: u64) {
        if self.registry.detach_inspector(seq).is_some() {
            METRICS.record_disconnect("inspector");
        }
    }
}
