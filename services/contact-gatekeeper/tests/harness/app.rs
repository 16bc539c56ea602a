// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! In-process application under test.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use contact_gatekeeper::{
    config::Config,
    handlers::{router, AppState},
    limiter::LimiterRegistry,
    notifier::{Notifier, NotifyError, OutboundEmail},
    validator::ContactValidator,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ALLOWED_ORIGIN: &str = "https://www.example.com";

/// Notifier double that records every email it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
    reject_with: Option<u16>,
}

impl RecordingNotifier {
    /// A notifier whose provider always rejects with `status`.
    pub fn failing(status: u16) -> Self {
        Self {
            sent: Mutex::default(),
            reject_with: Some(status),
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: &OutboundEmail) -> Result<u16, NotifyError> {
        self.sent.lock().unwrap().push(email.clone());
        match self.reject_with {
            Some(status) => Err(NotifyError::Rejected {
                status,
                body: "rejected".to_string(),
            }),
            None => Ok(202),
        }
    }
}

/// Configuration with the required keys filled in.
pub fn test_config(rate_per_sec: f64, burst: u32) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("ALLOWED_ORIGIN", ALLOWED_ORIGIN.to_string()),
        ("RECIPIENT_NAME", "Site Owner".to_string()),
        ("RECIPIENT_EMAIL", "owner@example.com".to_string()),
        ("SENDGRID_API_KEY", "SG.test".to_string()),
        ("RATE_PER_SEC", rate_per_sec.to_string()),
        ("BURST", burst.to_string()),
    ]);
    Config::from_lookup(|k| vars.get(k).cloned()).expect("test config should load")
}

/// Router, registry and notifier wired together as in `main`.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<LimiterRegistry>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestApp {
    /// An app whose limiter never gets in the way.
    pub fn new() -> Self {
        Self::with_limits(1000.0, 1000)
    }

    pub fn with_limits(rate_per_sec: f64, burst: u32) -> Self {
        Self::build(rate_per_sec, burst, RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::build(1000.0, 1000, notifier)
    }

    fn build(rate_per_sec: f64, burst: u32, notifier: RecordingNotifier) -> Self {
        let config = test_config(rate_per_sec, burst);
        let registry = Arc::new(LimiterRegistry::from_config(&config.rate_limit));
        let notifier = Arc::new(notifier);

        let state = Arc::new(AppState {
            validator: ContactValidator::new(),
            notifier: notifier.clone(),
            config,
        });

        Self {
            router: router(state, registry.clone()).expect("router should build"),
            registry,
            notifier,
        }
    }

    /// Send `request` as if it arrived from `peer`.
    pub async fn send_from(&self, peer: SocketAddr, mut request: Request<Body>) -> TestResponse {
        request.extensions_mut().insert(ConnectInfo(peer));

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body_bytes).into_owned(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        self.send_from(default_peer(), request).await
    }
}

pub fn default_peer() -> SocketAddr {
    "198.51.100.10:40000".parse().unwrap()
}

/// A form-encoded request from the allowed origin.
pub fn form_request(method: Method, path: &str, body: &str) -> Request<Body> {
    form_request_with_origin(method, path, Some(ALLOWED_ORIGIN), body)
}

/// A `multipart/form-data` request from the allowed origin, one text part
/// per pair.
pub fn multipart_request(path: &str, parts: &[(&str, &str)]) -> Request<Body> {
    let boundary = "gatekeeper-test-boundary";
    let mut body = String::new();
    for (name, value) in parts {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .body(Body::from(body))
        .expect("Failed to build request")
}

pub fn form_request_with_origin(
    method: Method,
    path: &str,
    origin: Option<&str>,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");

    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }

    builder
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}
