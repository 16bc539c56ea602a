// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact gatekeeper.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. The origin, recipient and mail API key are required; everything else
//! falls back to the defaults below.

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors. All of them are fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration key: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Configuration for the contact gatekeeper service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8088)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// The only origin allowed to submit the form
    pub allowed_origin: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Outbound notification configuration
    pub notify: NotifyConfig,
}

/// Per-client token bucket policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens added per second (default: 1.0)
    #[serde(default = "default_rate_per_sec")]
    pub rate_per_sec: f64,

    /// Bucket capacity (default: 1)
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Buckets untouched for this long are evicted (default: 300)
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,

    /// How often the eviction sweep runs (default: 60)
    #[serde(default = "default_evict_interval_secs")]
    pub evict_interval_secs: u64,
}

/// Mail provider and addressing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub recipient_name: String,
    pub recipient_email: String,

    #[serde(skip_serializing)]
    pub api_key: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8088".to_string()
}

fn default_rate_per_sec() -> f64 {
    1.0
}

fn default_burst() -> u32 {
    1
}

fn default_idle_secs() -> u64 {
    300
}

fn default_evict_interval_secs() -> u64 {
    60
}

fn default_sender_name() -> String {
    "Digital Masterpiece".to_string()
}

fn default_sender_email() -> String {
    "noreply@digital-masterpiece.com".to_string()
}

fn default_base_url() -> String {
    "https://api.sendgrid.com".to_string()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: default_rate_per_sec(),
            burst: default_burst(),
            idle_secs: default_idle_secs(),
            evict_interval_secs: default_evict_interval_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Idle time after which a bucket may be evicted.
    pub fn idle_duration(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    /// Interval between eviction sweeps.
    pub fn evict_interval(&self) -> Duration {
        Duration::from_secs(self.evict_interval_secs)
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
                _ => Err(ConfigError::Missing(key)),
            }
        };
        let optional = |key: &'static str, default: String| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let rate_limit = RateLimitConfig {
            rate_per_sec: parse_optional(&lookup, "RATE_PER_SEC", default_rate_per_sec())?,
            burst: parse_optional(&lookup, "BURST", default_burst())?,
            idle_secs: parse_optional(&lookup, "BUCKET_IDLE_SECS", default_idle_secs())?,
            evict_interval_secs: parse_optional(
                &lookup,
                "EVICT_INTERVAL_SECS",
                default_evict_interval_secs(),
            )?,
        };

        if !(rate_limit.rate_per_sec.is_finite() && rate_limit.rate_per_sec > 0.0) {
            return Err(ConfigError::Invalid {
                key: "RATE_PER_SEC",
                value: rate_limit.rate_per_sec.to_string(),
                reason: "must be a positive number",
            });
        }
        if rate_limit.burst < 1 {
            return Err(ConfigError::Invalid {
                key: "BURST",
                value: rate_limit.burst.to_string(),
                reason: "must be at least 1",
            });
        }
        if rate_limit.evict_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "EVICT_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }

        let config = Self {
            bind_addr: optional("BIND_ADDR", default_bind_addr()),
            allowed_origin: required("ALLOWED_ORIGIN")?,
            rate_limit,
            notify: NotifyConfig {
                recipient_name: required("RECIPIENT_NAME")?,
                recipient_email: required("RECIPIENT_EMAIL")?,
                api_key: required("SENDGRID_API_KEY")?,
                sender_name: optional("SENDER_NAME", default_sender_name()),
                sender_email: optional("SENDER_EMAIL", default_sender_email()),
                base_url: optional("SENDGRID_BASE_URL", default_base_url()),
            },
        };
        config.allowed_origin_header()?;

        Ok(config)
    }

    /// The allowed origin as a response header value.
    pub fn allowed_origin_header(&self) -> Result<HeaderValue, ConfigError> {
        HeaderValue::from_str(&self.allowed_origin).map_err(|_| ConfigError::Invalid {
            key: "ALLOWED_ORIGIN",
            value: self.allowed_origin.clone(),
            reason: "must be usable as a header value",
        })
    }
}

fn parse_optional<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: v,
            reason: "could not be parsed",
        }),
        _ => Ok(default),
    }
}
