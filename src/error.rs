//! Error types and handling for the ice estimation service

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Main error type for the icepack service
#[derive(Error, Debug)]
pub enum IceError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed shipment input
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A location identifier that the resolver does not know
    #[error("Location not found: {location}")]
    LocationNotFound { location: String },

    /// External service communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// An external call that did not answer in time
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl IceError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn location_not_found<S: Into<String>>(location: S) -> Self {
        Self::LocationNotFound {
            location: location.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(operation: S, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Stable machine-readable code, used in HTTP error bodies
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            IceError::Config { .. } => "config_error",
            IceError::Validation { .. } => "validation_error",
            IceError::LocationNotFound { .. } => "location_not_found",
            IceError::Api { .. } => "api_error",
            IceError::Timeout { .. } => "timeout",
            IceError::Io { .. } => "io_error",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            IceError::Validation { .. } => StatusCode::BAD_REQUEST,
            IceError::LocationNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            IceError::Api { .. } => StatusCode::BAD_GATEWAY,
            IceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            IceError::Config { .. } | IceError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            IceError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            IceError::Validation { message } => format!("Invalid input: {message}"),
            IceError::LocationNotFound { location } => {
                format!("Unknown location '{location}'. Use a 5-digit US zip code or \"lat,lon\".")
            }
            IceError::Api { .. } | IceError::Timeout { .. } => {
                "Unable to reach an external service. Please try again later.".to_string()
            }
            IceError::Io { .. } => "File operation failed. Please check file permissions.".to_string(),
        }
    }
}

impl IntoResponse for IceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.user_message(),
        }));
        (status, body).into_response()
    }
}
