use thiserror::Error;

/// Failure of a single HTTP exchange with the Sector API.
///
/// Only owned, cloneable data is kept (no `reqwest::Error`), so one login
/// outcome can be handed to every task that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The per-request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// Connection refused, reset, DNS failure and similar.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body was not the JSON shape we expected, with a preview for debugging.
    #[error("invalid response body: {message}")]
    Decode { message: String, body: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be built (bad header value, client builder failure).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Timeouts, connection failures and 5xx responses are worth retrying.
    /// 4xx responses never are.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::Decode { .. } | Self::InvalidUrl(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Any 4xx: the request itself was refused.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// 401 or 403: the service refused who we are, not what we sent.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status: status.as_u16(),
                body: String::new(),
            }
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
                body: String::new(),
            }
        } else {
            // connect, request and body errors (resets mid-stream) all land here
            Self::Connection(err.to_string())
        }
    }
}

/// Authentication failures surfaced by [`AuthSession`](crate::AuthSession).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The service refused the username/password pair (or returned no token).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Transport failed after exhausting retries, or the service refused
    /// the exchange for a reason other than the credentials (429, 400).
    #[error("authentication service unavailable: {0}")]
    ServiceUnavailable(TransportError),

    /// Login is suspended after repeated credential rejections.
    #[error("login locked after repeated credential rejections -- supply new credentials")]
    Locked,
}

/// Top-level error type for the `sector-api` crate.
///
/// `sector-core` maps these into fetch and command failures.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Returns `true` if this is a transient transport error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_transient(),
            Self::Auth(AuthError::ServiceUnavailable(_)) => true,
            Self::Auth(_) => false,
        }
    }

    /// HTTP status of the failed exchange, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) | Self::Auth(AuthError::ServiceUnavailable(e)) => e.status(),
            Self::Auth(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let server = TransportError::HttpStatus {
            status: 503,
            body: String::new(),
        };
        let client = TransportError::HttpStatus {
            status: 400,
            body: String::new(),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(client.is_client_error());
        assert!(TransportError::Timeout.is_transient());
    }

    #[test]
    fn only_401_and_403_reject_credentials() {
        let status = |status| TransportError::HttpStatus {
            status,
            body: String::new(),
        };
        assert!(status(401).is_credential_rejection());
        assert!(status(403).is_credential_rejection());
        assert!(!status(429).is_credential_rejection());
        assert!(!status(400).is_credential_rejection());
        assert!(status(429).is_client_error());
        assert!(!TransportError::Timeout.is_credential_rejection());
    }

    #[test]
    fn decode_errors_are_not_retried() {
        let err = TransportError::Decode {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        assert!(!err.is_transient());
        assert!(!Error::from(err).is_transient());
    }

    #[test]
    fn auth_unavailable_carries_status() {
        let err = Error::from(AuthError::ServiceUnavailable(TransportError::HttpStatus {
            status: 502,
            body: String::new(),
        }));
        assert_eq!(err.status(), Some(502));
        assert!(err.is_transient());
    }
}
