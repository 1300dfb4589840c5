use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Boxed underlying cause carried by transport failures.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Every error the transport pipeline can surface.
///
/// Errors raised while encoding a body or applying the body policy are
/// produced before dispatch and never reach a backend.
#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Request construction errors
    #[error("Multipart encoding failed: {reason}")]
    Encoding { reason: String },
    #[error("{method} requires a request body")]
    MissingBody { method: String },
    #[error("Unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },
    #[error("Writing the request body failed: {source}")]
    BodySerialization {
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Dispatch errors
    #[error("Transport failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Request cancelled")]
    Cancelled,
    #[error("Unrecognized protocol: {token}")]
    ProtocolParse { token: String },

    // Response consumption errors
    #[error("HTTP body error")]
    HttpBodyError,
    #[error("Unsupported charset: {charset}")]
    UnsupportedCharset { charset: String },
    #[error("Invalid UTF-8 in response body")]
    InvalidUtf8,
    #[error("JSON parse error")]
    JsonParseError,

    // Collaborator errors
    #[error("Cookie store failed: {message}")]
    CookieStore { message: String },
    #[error("Too many retries")]
    TooManyRetries,
}

impl NetError {
    /// Create an encoding error.
    pub fn encoding(reason: impl Into<String>) -> Self {
        NetError::Encoding {
            reason: reason.into(),
        }
    }

    /// Wrap an I/O failure of the underlying transport.
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        NetError::Transport {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Wrap an I/O failure while producing request body bytes.
    pub fn body_serialization(source: io::Error) -> Self {
        NetError::BodySerialization {
            source: Arc::new(source),
        }
    }

    /// Create a cookie store error.
    pub fn cookie_store(message: impl Into<String>) -> Self {
        NetError::CookieStore {
            message: message.into(),
        }
    }

    /// Stable numeric code for logging and foreign callers.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionFailed => -104,
            NetError::ConnectionTimedOut => -118,
            NetError::Transport { .. } => -119,
            NetError::Cancelled => -3,
            NetError::InvalidUrl => -300,
            NetError::UnsupportedMethod { .. } => -322,
            NetError::ProtocolParse { .. } => -370,
            NetError::TooManyRetries => -375,
            NetError::HttpBodyError => -10001,
            NetError::InvalidUtf8 => -10002,
            NetError::JsonParseError => -10003,
            NetError::InvalidHeader => -10004,
            NetError::Encoding { .. } => -10100,
            NetError::MissingBody { .. } => -10101,
            NetError::BodySerialization { .. } => -10102,
            NetError::UnsupportedCharset { .. } => -10103,
            NetError::CookieStore { .. } => -10200,
            NetError::InvalidConfig { .. } => -10300,
        }
    }

    /// Errors that must not be retried by any caller policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NetError::Encoding { .. }
                | NetError::MissingBody { .. }
                | NetError::UnsupportedMethod { .. }
                | NetError::ProtocolParse { .. }
                | NetError::InvalidUrl
                | NetError::InvalidHeader
                | NetError::InvalidConfig { .. }
                | NetError::Cancelled
        )
    }

    /// Errors a caller-supplied retry policy may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetError::Transport { .. } | NetError::ConnectionFailed | NetError::ConnectionTimedOut
        )
    }
}
