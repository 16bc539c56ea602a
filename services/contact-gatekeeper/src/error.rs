// SPDX-License-Identifier: Apache-2.0
//! HTTP-facing error types for the contact gatekeeper

use crate::validator::ValidationError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Request rejection types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not Found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Malformed form body.")]
    MalformedForm,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Too Many Requests")]
    RateLimited { retry_after: Duration },
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedForm | Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "ORIGIN_NOT_ALLOWED",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::MalformedForm => "MALFORMED_FORM",
            Self::Invalid(ValidationError::InvalidName) => "INVALID_NAME",
            Self::Invalid(ValidationError::InvalidEmail) => "INVALID_EMAIL",
            Self::RateLimited { .. } => "RATE_LIMITED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
            retry_after_secs: None,
        };

        match self {
            Self::RateLimited { retry_after } => {
                // Retry-After is whole seconds; never advertise 0 for a denied request.
                let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
                (
                    status,
                    [(header::RETRY_AFTER, secs.to_string())],
                    Json(ErrorResponse {
                        retry_after_secs: Some(secs),
                        ..body
                    }),
                )
                    .into_response()
            }
            Self::MethodNotAllowed => {
                (status, [(header::ALLOW, "POST")], Json(body)).into_response()
            }
            _ => (status, Json(body)).into_response(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
