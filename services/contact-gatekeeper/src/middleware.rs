// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission middleware.
//!
//! Runs in front of the router: the peer's socket address selects a token
//! bucket and the request either proceeds untouched or is answered with 429.
//! Forwarded-for headers are deliberately not consulted.

use crate::error::ApiError;
use crate::limiter::LimiterRegistry;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Client identity for rate limiting: `host:port` of the peer.
pub fn client_identity(addr: &SocketAddr) -> String {
    addr.to_string()
}

/// Token bucket admission check, for use with
/// `axum::middleware::from_fn_with_state`.
pub async fn rate_limit(
    State(registry): State<Arc<LimiterRegistry>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_identity(&addr);
    let (allowed, bucket) = registry.check(&client).await;

    if allowed {
        debug!(client = %client, remaining = bucket.remaining(), "Request admitted");
        next.run(request).await
    } else {
        let retry_after = bucket.retry_after();
        warn!(
            client = %client,
            path = %request.uri().path(),
            retry_after_ms = retry_after.as_millis() as u64,
            "Request rate limited"
        );
        ApiError::RateLimited { retry_after }.into_response()
    }
}
