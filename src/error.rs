use std::fmt;
use std::time::Duration;

use hyper::StatusCode;
use thiserror::Error;

/// Errors raised while authorizing or talking to the Display & Video 360 API
#[derive(Debug, Error)]
pub enum Error {
    /// A credentials or client secrets file is missing, unreadable or malformed
    #[error("invalid credentials in {location}: {reason}")]
    Config { location: String, reason: String },

    /// Input was needed from the console and could not be obtained
    #[error("{0}")]
    Input(String),

    /// The OAuth flow was denied, failed on the network or could not listen for the redirect
    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] hyper::Error),

    #[error(transparent)]
    Request(#[from] hyper::http::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status
    #[error("API request failed with {status}: {body}")]
    Api { status: StatusCode, body: String },
}

impl Error {
    pub(crate) fn config(location: impl fmt::Display, reason: impl ToString) -> Self {
        Error::Config {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn authorization(reason: impl ToString) -> Self {
        Error::Authorization(reason.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
