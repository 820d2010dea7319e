//! Connection lifecycle state machine.
//!
//! A connection moves strictly forward through these states; there is no
//! reopen. Requests are only accepted while the connection is `Active`.

use fxp_platform::{FxpError, FxpResult};

/// Lifecycle state of an SFTP connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress; no requests accepted yet.
    Connecting,

    /// Handshake complete; requests flow.
    Active {
        /// Negotiated protocol version.
        version: u32,
    },

    /// Orderly shutdown requested; in-flight requests are being released.
    Closing,

    /// All tasks have stopped.
    Closed {
        /// Cause of death for connections that failed, `None` for an
        /// orderly shutdown.
        error: Option<String>,
    },
}

impl ConnectionState {
    /// Transitions to the next state.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition would move backwards
    /// (e.g. `Closed` -> `Active`).
    pub fn transition(&mut self, next: ConnectionState) -> FxpResult<()> {
        let valid = match (&*self, &next) {
            // Normal progression
            (ConnectionState::Connecting, ConnectionState::Active { .. }) => true,
            (ConnectionState::Active { .. }, ConnectionState::Closing) => true,
            (ConnectionState::Closing, ConnectionState::Closed { .. }) => true,
            // Failure can strike from any live state
            (ConnectionState::Connecting, ConnectionState::Closed { .. }) => true,
            (ConnectionState::Active { .. }, ConnectionState::Closed { .. }) => true,
            // Re-entering the same state is a no-op
            (s1, s2) if std::mem::discriminant(s1) == std::mem::discriminant(s2) => true,
            _ => false,
        };

        if !valid {
            return Err(FxpError::Protocol(format!(
                "invalid connection state transition: {:?} -> {:?}",
                self, next
            )));
        }

        *self = next;
        Ok(())
    }

    /// Returns whether requests are currently accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Active { .. })
    }

    /// Returns the cause of death, if the connection failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            ConnectionState::Closed { error: Some(e) } => Some(e),
            _ => None,
        }
    }
}
