// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Gatekeeper Service
//!
//! Accepts contact form posts on `/`, rate limits them per client address,
//! validates and sanitizes the fields, then forwards them by email.
//!
//! ## Configuration
//!
//! Read from environment variables, optionally seeded from `.env`:
//!
//! - `ALLOWED_ORIGIN` (required): the only origin allowed to post
//! - `RECIPIENT_NAME`, `RECIPIENT_EMAIL` (required): notification destination
//! - `SENDGRID_API_KEY` (required): mail API credential
//! - `BIND_ADDR`: server bind address (default: 0.0.0.0:8088)
//! - `RATE_PER_SEC`: tokens refilled per second per client (default: 1)
//! - `BURST`: bucket capacity per client (default: 1)
//! - `BUCKET_IDLE_SECS`: idle time before a bucket is evicted (default: 300)
//! - `EVICT_INTERVAL_SECS`: eviction sweep interval (default: 60)
//! - `SENDER_NAME`, `SENDER_EMAIL`, `SENDGRID_BASE_URL`: mail overrides

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_gatekeeper::{
    config::Config, handlers::router, limiter::LimiterRegistry, notifier::SendGridNotifier,
    validator::ContactValidator, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            error!(error = %e, "Failed to read .env file");
            return Err(e.into());
        }
    }
    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;
    info!(
        bind_addr = %config.bind_addr,
        allowed_origin = %config.allowed_origin,
        rate_per_sec = config.rate_limit.rate_per_sec,
        burst = config.rate_limit.burst,
        "Starting contact gatekeeper"
    );

    // Create application state
    let registry = Arc::new(LimiterRegistry::from_config(&config.rate_limit));
    let notifier = Arc::new(SendGridNotifier::from_config(&config.notify));

    let state = Arc::new(AppState {
        validator: ContactValidator::new(),
        notifier,
        config: config.clone(),
    });

    // Spawn eviction task
    let evict_registry = registry.clone();
    let idle = config.rate_limit.idle_duration();
    let every = config.rate_limit.evict_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            evict_registry.evict_idle(idle).await;
        }
    });

    let app = router(state, registry).map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    // Start server
    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        error!(bind_addr = %config.bind_addr, error = %e, "Invalid bind address");
        e
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(addr = %addr, error = %e, "Failed to bind listener");
        e
    })?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
