//! Error types for fxp

use std::fmt;

/// Unified error type for all fxp operations
#[derive(Debug)]
pub enum FxpError {
    /// I/O error on the underlying byte stream
    Io(std::io::Error),

    /// Protocol error (malformed frame, unexpected reply, truncated field)
    Protocol(String),

    /// Handshake error (unexpected message or unsupported version)
    Handshake(String),

    /// Error reported by the remote server in a Status reply
    Remote {
        /// SSH_FX_* status code
        code: u32,
        /// Human-readable message supplied by the server
        message: String,
    },

    /// Operation attempted on a connection that has shut down
    Closed(String),
}

impl FxpError {
    /// Returns the remote status code if this is a server-reported error.
    ///
    /// Useful for distinguishing conditions such as end-of-file or
    /// no-such-file without matching on message text.
    pub fn remote_code(&self) -> Option<u32> {
        match self {
            FxpError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns whether this error is fatal to the connection.
    ///
    /// Remote status errors affect only the request that triggered them;
    /// everything else tears the connection down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FxpError::Remote { .. })
    }
}

impl fmt::Display for FxpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FxpError::Io(e) => write!(f, "IO error: {}", e),
            FxpError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            FxpError::Handshake(msg) => write!(f, "Handshake error: {}", msg),
            FxpError::Remote { code, message } => {
                write!(f, "Remote error {}: {}", code, message)
            }
            FxpError::Closed(msg) => write!(f, "Connection closed: {}", msg),
        }
    }
}

impl std::error::Error for FxpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FxpError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FxpError {
    fn from(err: std::io::Error) -> Self {
        FxpError::Io(err)
    }
}

/// Result type for fxp operations
pub type FxpResult<T> = Result<T, FxpError>;
