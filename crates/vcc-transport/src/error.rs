use vcc_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Creating, binding or connecting the socket failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer closed the stream between two frames.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The connection was closed locally.
    #[error("connection already closed")]
    Closed,

    /// The bytes on the wire broke the framing rules.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// `true` for errors that mean the stream can no longer be trusted to
    /// be on a frame boundary.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
