//! Error types for the session layer.

use vcc_protocol::ProtocolError;
use vcc_transport::TransportError;

/// Errors that can occur while logging in or sending on behalf of the
/// session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server answered the login with no user id: wrong password, or
    /// the user doesn't exist.
    #[error("login failed for {0}: wrong password or user doesn't exist")]
    LoginFailed(String),

    /// The first frame after a login request was not a login reply.
    #[error("invalid response received: expected CTL_LOGIN, got {0}")]
    UnexpectedReply(String),

    /// The connection failed underneath.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A field did not fit its wire width.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
