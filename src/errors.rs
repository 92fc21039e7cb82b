use std::fmt;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Reqwest(reqwest::Error),
    Http(StatusCode, String),
    Auth(String),
    Refresh(RefreshError),
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Reqwest(err)
    }
}

impl From<RefreshError> for Error {
    fn from(err: RefreshError) -> Self {
        Error::Refresh(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Reqwest(err) => write!(f, "http transport error: {err}"),
            Error::Http(status, body) => write!(f, "unexpected response {status}: {body}"),
            Error::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Error::Refresh(err) => write!(f, "session refresh failed: {err}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Reqwest(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure delivered to every caller sharing an in-flight refresh.
///
/// A single refresh rejection fans out to the leader and all queued waiters
/// identically, so unlike [`Error`] this type is `Clone`.
#[derive(Clone, Debug)]
pub struct RefreshError {
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshError {
    /// The refresh endpoint answered with a non-success status.
    pub fn endpoint(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status: Some(status.as_u16()),
            message: body.into(),
        }
    }

    /// The refresh call never produced a usable response.
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    /// The refresh was abandoned before settling (leader dropped or panicked).
    pub fn aborted() -> Self {
        Self {
            status: None,
            message: "refresh abandoned before completion".to_string(),
        }
    }

    pub(crate) fn from_error(err: &Error) -> Self {
        match err {
            Error::Http(status, body) => Self::endpoint(*status, body.clone()),
            Error::Reqwest(err) => Self::transport(err),
            Error::Refresh(inner) => inner.clone(),
            other => Self {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "refresh rejected with status {}: {}",
                status, self.message
            ),
            None => write!(f, "{}", self.message),
        }
    }
}
