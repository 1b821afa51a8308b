//! Error types for the RCON client.

use thiserror::Error;

/// Errors that can occur while talking to an RCON server.
#[derive(Debug, Error)]
pub enum RconError {
    /// Socket-level failure (connect, read or write).
    #[error("RCON I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server rejected the password.
    #[error("RCON authentication failed")]
    AuthFailed,

    /// Connecting or logging in took longer than the configured timeout.
    #[error("RCON connection timed out")]
    Timeout,

    /// The command body exceeds what the server accepts in one packet.
    #[error("RCON command is {len} bytes, maximum is {max}")]
    CommandTooLong {
        /// Length of the rejected command in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        max: usize,
    },

    /// The server sent something that is not a valid RCON packet.
    #[error("malformed RCON packet: {0}")]
    Malformed(String),

    /// The connection ended before a response arrived.
    #[error("RCON connection closed")]
    Closed,
}

impl RconError {
    /// Returns `true` if the error means the connection is no longer usable.
    ///
    /// `CommandTooLong` is rejected before anything is written, so the
    /// session survives it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RconError::CommandTooLong { .. })
    }
}

/// Result alias for RCON operations.
pub type Result<T> = std::result::Result<T, RconError>;
