use std::io::Error as IoError;

/// Everything that can cut a request cycle or a whole session short.
///
/// Conditions raised while answering one request are converted into an HTTP
/// response by the session's dispatch table; [`Closed`](SessionError::Closed)
/// and [`Shutdown`](SessionError::Shutdown) end the session without a
/// response.
#[derive(Debug)]
pub enum SessionError {
    /// Request shorter than the minimum viable request line or missing its
    /// structure. Answered with a generic 400.
    Malformed,
    /// Method other than `GET`. Answered with a generic 501.
    NotSupported,
    /// HTTP major version other than 1. Answered with a generic 505.
    Version,
    /// The resolved path does not exist. Answered with the fallback page or
    /// a generic 404.
    NotFound(String),
    /// The resolved path escapes the document root. Answered exactly like
    /// [`NotFound`](SessionError::NotFound) so out-of-root paths stay
    /// indistinguishable from missing ones.
    Forbidden(String),
    /// Host I/O failure or a failed include expansion. Answered with a
    /// generic 500.
    Internal(String),
    /// The transport died or the keepalive window expired mid-request.
    Closed,
    /// The shared running flag was cleared.
    Shutdown,
}

impl std::error::Error for SessionError {}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => f.write_str("malformed http request"),
            Self::NotSupported => f.write_str("operation not supported"),
            Self::Version => f.write_str("http version not supported"),
            Self::NotFound(target) => write!(f, "resource \"{target}\" not found"),
            Self::Forbidden(target) => write!(f, "resource \"{target}\" is outside the document root"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Closed => f.write_str("connection closed"),
            Self::Shutdown => f.write_str("session terminated: exit requested"),
        }
    }
}

impl From<IoError> for SessionError {
    fn from(err: IoError) -> Self {
        Self::Internal(err.to_string())
    }
}
