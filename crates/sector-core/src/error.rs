// ── Core error types ──
//
// Consumer-facing errors from sector-core. `From<sector_api::Error>`
// impls translate transport and auth failures into fetch, command and
// connect failures so hosts never match on HTTP details.

use sector_api::{AuthError, TransportError};
use thiserror::Error;

use crate::model::Resource;

/// A single sub-resource fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeout, connection failure or 5xx after the transport's retries.
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("resource not found")]
    NotFound,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other 4xx.
    #[error("request rejected (HTTP {status})")]
    Rejected { status: u16 },
}

impl From<sector_api::Error> for FetchError {
    fn from(err: sector_api::Error) -> Self {
        match err {
            sector_api::Error::Auth(e) => Self::Unauthorized(e.to_string()),
            sector_api::Error::Transport(e) => Self::from(e),
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Decode { message, .. } => Self::MalformedResponse(message),
            e if e.is_not_found() => Self::NotFound,
            e if e.is_unauthorized() => Self::Unauthorized(e.to_string()),
            TransportError::HttpStatus { status, .. } if status < 500 => Self::Rejected { status },
            e => Self::Transient(e.to_string()),
        }
    }
}

/// A panel command failed. Every variant except `Rejected`,
/// `ServiceUnavailable` and `Auth` is raised before any network I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The service answered 4xx: wrong code, panel busy, and so on.
    #[error("command rejected by the service (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("panel is offline")]
    NotOnline,

    /// Missing PIN, non-digits, or wrong length for this panel.
    #[error("invalid code: {0}")]
    InvalidCodeFormat(String),

    #[error("no such device: {0}")]
    UnknownDevice(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// No snapshot with installation and panel status yet.
    #[error("installation state not loaded yet")]
    NotReady,

    #[error("not supported by this installation: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Auth(AuthError),

    #[error("hub is shut down")]
    ShutDown,
}

impl From<sector_api::Error> for CommandError {
    fn from(err: sector_api::Error) -> Self {
        match err {
            sector_api::Error::Auth(e) => Self::Auth(e),
            sector_api::Error::Transport(TransportError::HttpStatus { status, body })
                if (400..500).contains(&status) =>
            {
                Self::Rejected {
                    status,
                    message: body,
                }
            }
            sector_api::Error::Transport(e) => Self::ServiceUnavailable(e.to_string()),
        }
    }
}

/// Unified error type for hub setup and lifecycle.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("cannot reach the Sector service: {0}")]
    ConnectionFailed(String),

    #[error("no panel found for this account")]
    NoPanel,

    #[error("panel {0} is not visible to this account")]
    PanelNotFound(String),

    #[error("initial {resource} fetch failed: {source}")]
    InitialFetch {
        resource: Resource,
        source: FetchError,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("hub is not connected")]
    NotConnected,

    #[error("hub is shut down")]
    ShutDown,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl From<sector_api::Error> for CoreError {
    fn from(err: sector_api::Error) -> Self {
        match err {
            sector_api::Error::Auth(e) => Self::Authentication(e),
            sector_api::Error::Transport(e) => Self::ConnectionFailed(e.to_string()),
        }
    }
}

impl From<TransportError> for CoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidUrl(message) | TransportError::InvalidRequest(message) => {
                Self::Config { message }
            }
            e => Self::ConnectionFailed(e.to_string()),
        }
    }
}
