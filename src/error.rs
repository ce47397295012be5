use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::Strategy;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    Provider { strategy: Strategy, message: String },
    #[error("{message}")]
    MalformedResponse { strategy: Strategy, message: String },
    #[error("{0}")]
    Download(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        RelayError::BadRequest(message.into())
    }

    pub fn provider(strategy: Strategy, message: impl Into<String>) -> Self {
        RelayError::Provider {
            strategy,
            message: message.into(),
        }
    }

    pub fn malformed(strategy: Strategy, message: impl Into<String>) -> Self {
        RelayError::MalformedResponse {
            strategy,
            message: message.into(),
        }
    }

    /// Pipeline stage the error originated from, used in log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            RelayError::BadRequest(_) => "request",
            RelayError::Provider { .. } | RelayError::MalformedResponse { .. } => "provider",
            RelayError::Download(_) => "download",
            RelayError::Config(_) => "config",
            RelayError::Internal(_) => "relay",
        }
    }
}

/// JSON envelope returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Provider { strategy, .. }
            | RelayError::MalformedResponse { strategy, .. } => strategy.failure_status(),
            RelayError::Download(_) | RelayError::Config(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
