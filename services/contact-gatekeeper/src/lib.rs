// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Gatekeeper
//!
//! This crate guards a single contact form endpoint:
//!
//! - Per-client token bucket rate limiting, keyed by peer address
//! - Allowed-origin and POST-only enforcement
//! - Name and email validation
//! - Markup stripping of every submitted field
//! - Delivery of accepted submissions through a mail API

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod middleware;
pub mod notifier;
pub mod sanitize;
pub mod validator;

pub use config::Config;
pub use error::ApiError;
pub use handlers::{router, AppState};
pub use limiter::{LimiterRegistry, TokenBucket};
pub use notifier::{Notifier, SendGridNotifier};
pub use validator::{ContactValidator, ValidationResult};
