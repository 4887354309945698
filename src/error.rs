use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read feature catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid feature catalog {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature catalog defines no features")]
    Empty,

    #[error("feature {0} is defined more than once")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("request quota for this hour has been reached, try again later")]
    RateLimited,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("credential {0} is not configured")]
    MissingCredential(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("upstream request timed out")]
    Timeout,

    #[error("could not reach upstream: {0}")]
    Connect(String),

    #[error("upstream stream broke off: {0}")]
    Stream(String),
}

impl RelayError {
    // what the client sees; transport detail stays in the logs
    pub fn class(&self) -> String {
        match self {
            RelayError::MissingCredential(_) => "credential".to_string(),
            RelayError::Status(code) => format!("HTTP {}", code),
            RelayError::Timeout => "timeout".to_string(),
            RelayError::Connect(_) => "connection".to_string(),
            RelayError::Stream(_) => "stream".to_string(),
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout
        } else if err.is_connect() {
            RelayError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            RelayError::Status(status.as_u16())
        } else {
            RelayError::Stream(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("submitting too often, please wait a minute")]
    TooFrequent,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownFeature(_) => StatusCode::NOT_FOUND,
            ApiError::Gate(GateError::RateLimited) | ApiError::TooFrequent => {
                StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
