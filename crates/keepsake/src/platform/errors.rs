use chrono::{DateTime, Utc};
use thiserror::Error;

/// Typed failure of a single platform API call.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Credentials rejected or missing permissions.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded{}", .reset_at.map(|t| format!(". Resets at {t}")).unwrap_or_default())]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// Resource not found (user, item, etc.).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Network failure, timeout or 5xx. Safe to try again later.
    #[error("Transient error: {message}")]
    Transient { message: String },

    /// The platform answered with something we could not understand.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl PlatformError {
    #[inline]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// `reset_header` is the raw value of the platform's rate-limit reset
    /// header (unix seconds), when present.
    pub fn from_status(status: u16, resource: &str, reset_header: Option<&str>) -> Self {
        match status {
            401 | 403 => Self::unauthorized(format!("HTTP {status} for {resource}")),
            404 => Self::not_found(resource),
            420 | 429 => Self::RateLimited {
                reset_at: reset_header
                    .and_then(|v| v.trim().parse::<i64>().ok())
                    .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            },
            500..=599 => Self::transient(format!("HTTP {status} for {resource}")),
            _ => Self::protocol(format!("unexpected HTTP {status} for {resource}")),
        }
    }

    /// Rate limits and transient failures may succeed on a later attempt.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps per-account CLI
/// output to one line.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
