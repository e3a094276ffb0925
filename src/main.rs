// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Chatline Relay Server
//!
//! A text-protocol instant-messaging relay.
//! Provides:
//! - Prefix-dispatched text commands over TCP (login, friends, messaging)
//! - Per-recipient offline queues drained on the next login
//! - HTTP endpoint for Prometheus metrics

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use chatline_relay::config::RelayConfig;
use chatline_relay::credentials;
use chatline_relay::directory::UserDirectory;
use chatline_relay::dispatch::Dispatcher;
use chatline_relay::http::{create_router, HttpState};
use chatline_relay::metrics::RelayMetrics;
use chatline_relay::session::{self, SessionDeps};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chatline_relay=info".parse().unwrap()),
        )
        .init();

    let config = RelayConfig::from_env();

    info!(
        "Starting Chatline Relay Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Listen address: {}", config.listen_addr);
    info!("Users file: {}", config.users_file.display());
    info!("Metrics endpoint: {}", config.metrics_addr);

    // Seed the directory once; there is no runtime registration.
    let seed = match credentials::load_or_create(&config.users_file) {
        Ok(seed) => seed,
        Err(e) => {
            warn!(
                "Failed to load users file {}: {}; falling back to the default account",
                config.users_file.display(),
                e
            );
            vec![(
                credentials::DEFAULT_USERNAME.to_string(),
                credentials::DEFAULT_PASSWORD.to_string(),
            )]
        }
    };
    let directory = Arc::new(UserDirectory::from_credentials(seed));
    info!("Directory seeded with {} accounts", directory.len());

    // Initialize metrics
    let metrics = RelayMetrics::new();

    let metrics_token = std::env::var("CHATLINE_METRICS_TOKEN").ok();
    if metrics_token.is_some() {
        info!("Metrics endpoint protected with bearer token");
    }

    // Start HTTP server for metrics
    let http_state = HttpState {
        metrics: metrics.clone(),
        metrics_token,
    };
    let http_router = create_router(http_state);
    let metrics_addr = config.metrics_addr.clone();
    match TcpListener::bind(&metrics_addr).await {
        Ok(http_listener) => {
            tokio::spawn(async move {
                info!("HTTP server listening on {}", metrics_addr);
                if let Err(e) = axum::serve(http_listener, http_router).await {
                    warn!("HTTP server stopped: {}", e);
                }
            });
        }
        Err(e) => warn!("Failed to bind metrics listener on {}: {}", metrics_addr, e),
    }

    // Bind the relay listener. An unbound listener must never reach the
    // accept loop, so this failure is fatal.
    let listener = match TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(directory, metrics.clone()));

    info!("Accepting connections on {}", config.listen_addr);

    // Accept connections: one session task per client, no admission limit.
    while let Ok((stream, addr)) = listener.accept().await {
        metrics.connections_total.inc();
        metrics.connections_active.inc();

        let deps = SessionDeps {
            dispatcher: dispatcher.clone(),
            metrics: metrics.clone(),
        };
        let metrics = metrics.clone();

        tokio::spawn(async move {
            info!("New connection from {}", addr);
            session::handle_connection(stream, deps).await;
            metrics.connections_active.dec();
            info!("Connection closed");
        });
    }
}
