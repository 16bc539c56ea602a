// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact gatekeeper.
//!
//! A single route accepts the contact form. Admitted requests go through the
//! origin and method checks, field validation and sanitization before the
//! submission is handed to the notifier.

use crate::config::{Config, ConfigError};
use crate::error::{ApiError, Result};
use crate::limiter::LimiterRegistry;
use crate::middleware::rate_limit;
use crate::notifier::{ContactSubmission, Notifier, OutboundEmail};
use crate::sanitize::strip_html;
use crate::validator::{ContactValidator, ValidationResult};
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::any,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub validator: ContactValidator,
    pub notifier: Arc<dyn Notifier>,
    pub config: Config,
}

/// Form fields as submitted. Absent fields are empty strings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    /// Decode an `application/x-www-form-urlencoded` body. The first
    /// occurrence of a repeated key wins.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut fields = FormFields::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            if let Some(slot) = fields.slot(&key) {
                *slot = value.into_owned();
            }
        }
        fields.form
    }

    /// Decode a `multipart/form-data` body. Parts other than the three form
    /// fields are skipped unread; the first occurrence of a repeated name wins.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut fields = FormFields::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            warn!(error = %e, "Invalid request received: malformed multipart body");
            ApiError::MalformedForm
        })? {
            let name = field.name().unwrap_or_default().to_string();
            let Some(slot) = fields.slot(&name) else {
                continue;
            };
            *slot = field.text().await.map_err(|e| {
                warn!(field = %name, error = %e, "Invalid request received: unreadable multipart field");
                ApiError::MalformedForm
            })?;
        }
        Ok(fields.form)
    }
}

/// Form being filled in, remembering which fields were already set.
#[derive(Default)]
struct FormFields {
    form: ContactForm,
    seen: [bool; 3],
}

impl FormFields {
    /// The slot for `key` if it is a form field not yet filled in.
    fn slot(&mut self, key: &str) -> Option<&mut String> {
        let (slot, seen) = match key {
            "name" => (&mut self.form.name, &mut self.seen[0]),
            "email" => (&mut self.form.email, &mut self.seen[1]),
            "message" => (&mut self.form.message, &mut self.seen[2]),
            _ => return None,
        };
        if *seen {
            return None;
        }
        *seen = true;
        Some(slot)
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Success response body.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
}

/// Build the service router: the contact route, a 404 fallback, and the
/// rate limiter in front of both. Fails if the allowed origin cannot be sent
/// as a header.
pub fn router(
    state: Arc<AppState>,
    registry: Arc<LimiterRegistry>,
) -> std::result::Result<Router, ConfigError> {
    let allowed_origin = state.config.allowed_origin_header()?;

    let router = Router::new()
        .route("/", any(contact))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            allowed_origin,
        ))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST"),
        ))
        .fallback(not_found)
        .with_state(state)
        .layer(from_fn_with_state(registry, rate_limit))
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

/// Any path other than `/`.
pub async fn not_found(uri: Uri) -> ApiError {
    debug!(path = %uri.path(), "No route");
    ApiError::NotFound
}

/// Accept a contact form submission, url-encoded or multipart.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, axum::Json<SubmitResponse>)> {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if origin != state.config.allowed_origin {
        warn!(origin = %origin, "Invalid request received: origin not allowed");
        return Err(ApiError::Forbidden);
    }

    if request.method() != Method::POST {
        warn!(method = %request.method(), "Invalid request received: method not allowed");
        return Err(ApiError::MethodNotAllowed);
    }

    let form = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state).await.map_err(|e| {
            warn!(error = %e, "Invalid request received: malformed multipart body");
            ApiError::MalformedForm
        })?;
        ContactForm::from_multipart(multipart).await?
    } else {
        let body = Bytes::from_request(request, &state).await.map_err(|e| {
            warn!(error = %e, "Invalid request received: unreadable body");
            ApiError::MalformedForm
        })?;
        ContactForm::from_urlencoded(&body)
    };

    if let ValidationResult::Invalid(err) = state.validator.validate(&form.name, &form.email) {
        warn!(field = err.field(), error = %err, "Invalid request received");
        return Err(err.into());
    }

    let submission = ContactSubmission {
        name: strip_html(&form.name),
        email: strip_html(&form.email),
        message: strip_html(&form.message),
        received_at: Utc::now(),
    };
    info!(received_at = %submission.received_at, "Valid request received");

    let email = OutboundEmail::from_submission(&submission, &state.config.notify);
    match state.notifier.send(&email).await {
        Ok(status) => info!(status, "Notification dispatched"),
        // Delivery is best effort; the submitter still gets a success response.
        Err(e) => error!(error = %e, "Notification failed"),
    }

    Ok((
        StatusCode::OK,
        axum::Json(SubmitResponse { status: "received" }),
    ))
}
