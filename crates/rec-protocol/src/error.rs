//! The error taxonomy shared across every component (spec §7).
//!
//! Each [`RecError`] carries a stable, machine-readable [`ErrorCategory`]
//! plus a human message, so the HTTP surface can map it to a status code and
//! a short code without guessing from a string.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    RangeTooLarge,
    InsufficientData,
    StoreUnavailable,
    BusUnavailable,
    PartialFailure,
    InvalidTarget,
    Unauthorized,
    Internal,
}

impl ErrorCategory {
    /// The conventional HTTP status for this category (spec §7 propagation
    /// policy). `insufficient-data` and `partial-failure` are analytical,
    /// not transport, outcomes — callers still get a 200 with the category
    /// embedded in the response body.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCategory::Validation | ErrorCategory::InvalidTarget => 400,
            ErrorCategory::Unauthorized => 401,
            ErrorCategory::NotFound => 404,
            ErrorCategory::RangeTooLarge => 413,
            ErrorCategory::InsufficientData | ErrorCategory::PartialFailure => 200,
            ErrorCategory::StoreUnavailable | ErrorCategory::BusUnavailable => 503,
            ErrorCategory::Internal => 500,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::RangeTooLarge => "range-too-large",
            ErrorCategory::InsufficientData => "insufficient-data",
            ErrorCategory::StoreUnavailable => "store-unavailable",
            ErrorCategory::BusUnavailable => "bus-unavailable",
            ErrorCategory::PartialFailure => "partial-failure",
            ErrorCategory::InvalidTarget => "invalid-target",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A user-visible failure: a stable machine code plus an optional human
/// message (spec §7). Stack traces / internal detail are never attached
/// here — that's a development-flag concern at the HTTP boundary.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{category}: {message}")]
pub struct RecError {
    pub category: ErrorCategory,
    pub message: String,
    /// Overrides `category.code()` in the HTTP body when a route's spec
    /// names a literal machine code (e.g. `userId_required`) that doesn't
    /// match the category taxonomy's kebab-case codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl RecError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        RecError {
            category,
            message: message.into(),
            code: None,
        }
    }

    /// Same as [`RecError::new`] but with an explicit wire code, for routes
    /// whose spec names a literal machine code.
    pub fn with_code(category: ErrorCategory, code: &'static str, message: impl Into<String>) -> Self {
        RecError {
            category,
            message: message.into(),
            code: Some(code.to_string()),
        }
    }

    /// The code to surface in the HTTP response body: the explicit
    /// override if set, else the category's own code.
    pub fn wire_code(&self) -> &str {
        self.code.as_deref().unwrap_or(self.category.code())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    pub fn range_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::RangeTooLarge, message)
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InsufficientData, message)
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::StoreUnavailable, message)
    }

    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidTarget, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, message)
    }
}

impl From<anyhow::Error> for RecError {
    fn from(err: anyhow::Error) -> Self {
        RecError::internal(err.to_string())
    }
}
