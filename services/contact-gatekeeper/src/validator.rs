// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Contact form field validator.
//!
//! - Name: at least two characters
//! - Email: `local@domain.tld` shape with a suffix of two or more characters
//! - Message: optional, unconstrained

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid name.")]
    InvalidName,

    #[error("Invalid email address.")]
    InvalidEmail,
}

impl ValidationError {
    /// The form field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidName => "name",
            Self::InvalidEmail => "email",
        }
    }
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Submission is valid
    Valid,
    /// Submission is invalid
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }
}

/// Contact form validator.
#[derive(Debug, Clone)]
pub struct ContactValidator {
    name: Regex,
    email: Regex,
}

impl Default for ContactValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactValidator {
    pub fn new() -> Self {
        Self {
            name: compile(r"^.{2,}$"),
            email: compile(r"^.+@.+\..{2,}$"),
        }
    }

    /// Validate the name field.
    pub fn validate_name(&self, name: &str) -> ValidationResult {
        if validate_parameter(&self.name, name) {
            ValidationResult::Valid
        } else {
            debug!(len = name.chars().count(), "Name rejected");
            ValidationResult::Invalid(ValidationError::InvalidName)
        }
    }

    /// Validate the email field.
    pub fn validate_email(&self, email: &str) -> ValidationResult {
        if validate_parameter(&self.email, email) {
            ValidationResult::Valid
        } else {
            debug!(email = %email, "Email rejected");
            ValidationResult::Invalid(ValidationError::InvalidEmail)
        }
    }

    /// Validate a complete submission. The message is not checked.
    pub fn validate(&self, name: &str, email: &str) -> ValidationResult {
        let name_result = self.validate_name(name);
        if !name_result.is_valid() {
            return name_result;
        }

        self.validate_email(email)
    }
}

/// A value passes when it is non-empty and matches `pattern`.
pub fn validate_parameter(pattern: &Regex, value: &str) -> bool {
    !value.is_empty() && pattern.is_match(value)
}

fn compile(pattern: &str) -> Regex {
    // Patterns are literals above; a failure here is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}
