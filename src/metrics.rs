//! Prometheus Metrics for Chatline Relay
//!
//! Provides observability metrics for monitoring the relay server.

use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Relay server metrics.
#[derive(Clone)]
pub struct RelayMetrics {
    /// Registry for all metrics.
    pub registry: Arc<Registry>,

    // Connection metrics
    /// Total client connections accepted.
    pub connections_total: IntCounter,
    /// Current active client connections.
    pub connections_active: IntGauge,

    // Message metrics
    /// Total wire messages received.
    pub messages_received: IntCounter,
    /// Messages that failed to parse (unknown prefix, malformed content).
    pub messages_invalid: IntCounter,
    /// Messages delivered live via push.
    pub messages_relayed: IntCounter,
    /// Messages queued for offline delivery.
    pub messages_queued: IntCounter,
    /// Messages lost to a push failure mid-send.
    pub messages_dropped: IntCounter,

    // Login metrics
    /// Successful logins.
    pub logins_succeeded: IntCounter,
    /// Rejected logins (unknown user or wrong password).
    pub logins_rejected: IntCounter,
}

impl RelayMetrics {
    /// Creates a new metrics instance with all counters registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let connections_total = IntCounter::with_opts(Opts::new(
            "chatline_connections_total",
            "Total client connections accepted",
        ))
        .unwrap();

        let connections_active = IntGauge::with_opts(Opts::new(
            "chatline_connections_active",
            "Current active client connections",
        ))
        .unwrap();

        let messages_received = IntCounter::with_opts(Opts::new(
            "chatline_messages_received_total",
            "Total wire messages received",
        ))
        .unwrap();

        let messages_invalid = IntCounter::with_opts(Opts::new(
            "chatline_messages_invalid_total",
            "Total messages that failed to parse",
        ))
        .unwrap();

        let messages_relayed = IntCounter::with_opts(Opts::new(
            "chatline_messages_relayed_total",
            "Total messages delivered live via push",
        ))
        .unwrap();

        let messages_queued = IntCounter::with_opts(Opts::new(
            "chatline_messages_queued_total",
            "Total messages queued for offline delivery",
        ))
        .unwrap();

        let messages_dropped = IntCounter::with_opts(Opts::new(
            "chatline_messages_dropped_total",
            "Total messages lost to a push failure mid-send",
        ))
        .unwrap();

        let logins_succeeded = IntCounter::with_opts(Opts::new(
            "chatline_logins_succeeded_total",
            "Total successful logins",
        ))
        .unwrap();

        let logins_rejected = IntCounter::with_opts(Opts::new(
            "chatline_logins_rejected_total",
            "Total rejected logins",
        ))
        .unwrap();

        // Register all metrics
        registry
            .register(Box::new(connections_total.clone()))
            .unwrap();
        registry
            .register(Box::new(connections_active.clone()))
            .unwrap();
        registry
            .register(Box::new(messages_received.clone()))
            .unwrap();
        registry
            .register(Box::new(messages_invalid.clone()))
            .unwrap();
        registry
            .register(Box::new(messages_relayed.clone()))
            .unwrap();
        registry
            .register(Box::new(messages_queued.clone()))
            .unwrap();
        registry
            .register(Box::new(messages_dropped.clone()))
            .unwrap();
        registry
            .register(Box::new(logins_succeeded.clone()))
            .unwrap();
        registry
            .register(Box::new(logins_rejected.clone()))
            .unwrap();

        RelayMetrics {
            registry: Arc::new(registry),
            connections_total,
            connections_active,
            messages_received,
            messages_invalid,
            messages_relayed,
            messages_queued,
            messages_dropped,
            logins_succeeded,
            logins_rejected,
        }
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
