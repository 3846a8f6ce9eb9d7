use std::sync::LazyLock;

use metrics::{counter, describe_counter};

/// Global metrics registry for the hub.
pub static METRICS: LazyLock<Metrics> = LazyLock::new(|| {
    describe_counter!(
        "relay_envelopes_total",
        "Total number of envelopes routed to clients",
    );

    describe_counter!(
        "relay_envelopes_dropped_total",
        "Total number of envelopes dropped on full send queues",
    );

    describe_counter!(
        "client_registrations_total",
        "Total number of client registrations",
    );

    describe_counter!(
        "client_disconnects_total",
        "Total number of client disconnects",
    );

    Metrics
});

/// Hub metrics facade (static methods for incrementing counters).
pub struct Metrics;

impl Metrics {
    /// Counts one routed envelope, labelled by its wire type.
    pub fn record_envelope(&self, kind: &'static str) {
        counter!("relay_envelopes_total", "type" => kind).increment(1);
    }

    /// Counts one envelope dropped because a send queue was at capacity.
    pub fn record_dropped_envelope(&self, kind: &'static str) {
        counter!("relay_envelopes_dropped_total", "type" => kind).increment(1);
    }

    pub fn record_registration(&self, client_kind: &'static str) {
        counter!("client_registrations_total", "kind" => client_kind).increment(1);
    }

    pub fn record_disconnect(&self, client_kind: &'static str) {
        counter!("client_disconnects_total", "kind" => client_kind).increment(1);
    }
}
