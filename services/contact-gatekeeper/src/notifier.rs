// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound notification of accepted submissions.
//!
//! The handler only talks to the [`Notifier`] trait; [`SendGridNotifier`] is
//! the production implementation against the SendGrid v3 mail API.

use crate::config::NotifyConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Subject line of every notification.
pub const SUBJECT: &str = "Contact Form Inquiry";

/// A validated, sanitized contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

/// A fully composed email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub sender_name: String,
    pub sender_email: String,
    pub subject: String,
    pub plain_text: String,
    pub html: String,
    pub recipient_name: String,
    pub recipient_email: String,
}

impl OutboundEmail {
    /// Compose the notification for `submission` using the configured
    /// sender and recipient.
    pub fn from_submission(submission: &ContactSubmission, config: &NotifyConfig) -> Self {
        let ContactSubmission {
            name,
            email,
            message,
            ..
        } = submission;

        Self {
            sender_name: config.sender_name.clone(),
            sender_email: config.sender_email.clone(),
            subject: SUBJECT.to_string(),
            plain_text: format!("Name: {name}\r\n\r\nEmail: {email}\r\n\r\nMessage: {message}"),
            html: format!("Name: {name}<br>Email: {email}<br>Message: {message}"),
            recipient_name: config.recipient_name.clone(),
            recipient_email: config.recipient_email.clone(),
        }
    }
}

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Mail API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers composed emails. Returns the provider's status code on success.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<u16, NotifyError>;
}

/// SendGrid v3 `mail/send` client.
pub struct SendGridNotifier {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 2],
}

impl<'a> From<&'a OutboundEmail> for MailSend<'a> {
    fn from(email: &'a OutboundEmail) -> Self {
        Self {
            personalizations: [Personalization {
                to: [Address {
                    email: &email.recipient_email,
                    name: &email.recipient_name,
                }],
            }],
            from: Address {
                email: &email.sender_email,
                name: &email.sender_name,
            },
            subject: &email.subject,
            // text/plain must precede text/html
            content: [
                Content {
                    kind: "text/plain",
                    value: &email.plain_text,
                },
                Content {
                    kind: "text/html",
                    value: &email.html,
                },
            ],
        }
    }
}

impl SendGridNotifier {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/mail/send", self.base_url)
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn send(&self, email: &OutboundEmail) -> Result<u16, NotifyError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&MailSend::from(email))
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "Mail API responded");

        if status.is_success() {
            Ok(status.as_u16())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
