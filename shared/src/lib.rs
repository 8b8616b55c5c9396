// lib.rs - shared core for the Trippi clients

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod avatar;
pub mod capabilities;
pub mod countries;
pub mod event;
pub mod forms;
pub mod model;
pub mod preferences;
pub mod profile;
pub mod recovery;
pub mod view;
pub mod view_state;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use event::{Event, Secret};
pub use model::Model;
pub use view::{ScreenView, UserFacingError, ViewModel};
pub use view_state::ViewTag;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_AVATAR_BYTES: u64 = 5 * 1024 * 1024;
pub const AVATAR_BUCKET: &str = "profile-pictures";

pub const INVALID_RESET_LINK_MESSAGE: &str =
    "Invalid or expired reset link. Please request a new password reset.";
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Database access denied. Please set up row-level security policies for the profiles table.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Permission,
    Network,
    Timeout,
    NotFound,
    Busy,
    Storage,
    InvalidState,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Authentication => "AUTH_ERROR",
            Self::Permission => "PERMISSION_DENIED",
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::NotFound => "NOT_FOUND",
            Self::Busy => "BUSY",
            Self::Storage => "STORAGE_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::Busy | Self::Storage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn busy(operation: &str) -> Self {
        Self::new(
            ErrorKind::Busy,
            format!("A {operation} request is already in progress"),
        )
        .with_context("operation", operation)
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::Authentication => self.message.clone(),
            ErrorKind::Permission => PERMISSION_DENIED_MESSAGE.into(),
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Busy => "Please wait for the current request to finish.".into(),
            ErrorKind::Storage => "Unable to save your preferences on this device.".into(),
            ErrorKind::InvalidState => {
                "This action is not available right now. Please sign in again.".into()
            }
            ErrorKind::Internal => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<capabilities::GatewayError> for AppError {
    fn from(e: capabilities::GatewayError) -> Self {
        use capabilities::GatewayError;

        match e {
            GatewayError::Auth { message } => AppError::new(ErrorKind::Authentication, message),
            GatewayError::Permission { message } => {
                AppError::new(ErrorKind::Permission, "Permission denied").with_internal(message)
            }
            GatewayError::Network { message } => {
                AppError::new(ErrorKind::Network, "Network error").with_internal(message)
            }
            GatewayError::Timeout { timeout_ms } => {
                AppError::new(ErrorKind::Timeout, "Request timed out")
                    .with_context("timeout_ms", timeout_ms.to_string())
            }
            GatewayError::NotFound => AppError::new(ErrorKind::NotFound, "Not found"),
            GatewayError::Rejected { status, message } => {
                AppError::new(ErrorKind::Internal, "Request failed")
                    .with_internal(message)
                    .with_context("http_status", status.to_string())
            }
            GatewayError::UnexpectedOutput { expected, found } => {
                AppError::new(ErrorKind::Internal, "Unexpected response")
                    .with_internal(format!("expected {expected}, found {found}"))
            }
        }
    }
}

impl From<capabilities::KvError> for AppError {
    fn from(e: capabilities::KvError) -> Self {
        AppError::new(ErrorKind::Storage, "Preference storage failed").with_internal(e.to_string())
    }
}

impl From<forms::ValidationError> for AppError {
    fn from(e: forms::ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::GatewayError;

    #[test]
    fn permission_errors_get_actionable_text() {
        let err: AppError = GatewayError::Permission {
            message: "new row violates row-level security policy".into(),
        }
        .into();

        assert_eq!(err.kind, ErrorKind::Permission);
        assert_eq!(err.user_facing_message(), PERMISSION_DENIED_MESSAGE);
        assert_ne!(
            err.user_facing_message(),
            AppError::new(ErrorKind::Internal, "x").user_facing_message()
        );
    }

    #[test]
    fn auth_errors_keep_backend_message() {
        let err: AppError = GatewayError::Auth {
            message: "Invalid login credentials".into(),
        }
        .into();
        assert_eq!(err.code(), "AUTH_ERROR");
        assert_eq!(err.user_facing_message(), "Invalid login credentials");
    }

    #[test]
    fn busy_is_retryable_and_tagged() {
        let err = AppError::busy("save");
        assert!(err.is_retryable());
        assert_eq!(err.context.get("operation").map(String::as_str), Some("save"));
    }

    #[test]
    fn display_includes_internal_message() {
        let err = AppError::new(ErrorKind::Network, "Network error").with_internal("dns");
        assert_eq!(err.to_string(), "[NETWORK_ERROR] Network error (internal: dns)");
    }
}
