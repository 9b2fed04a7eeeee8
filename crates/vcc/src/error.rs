//! Unified error type for the VCC client.

use vcc_plugin::{CommandError, PluginError};
use vcc_protocol::ProtocolError;
use vcc_session::SessionError;
use vcc_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// This is what [`VccClient::run`](crate::VccClient::run) returns and what
/// the binary reports before exiting non-zero.
#[derive(Debug, thiserror::Error)]
pub enum VccError {
    /// Connection failure (connect, send, receive, closed).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Wire-format error outside of a receive (an oversized field).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Login failure or a session send that failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A plugin error that reached the top level.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// A command failed in a way that leaves the connection unusable.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Reading interactive input failed.
    #[error("reading input failed: {0}")]
    Input(#[source] std::io::Error),
}

impl VccError {
    /// `true` when the server sent bytes that break the framing rules.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_protocol_violation(),
            Self::Session(SessionError::Transport(e)) => e.is_protocol_violation(),
            _ => false,
        }
    }
}
