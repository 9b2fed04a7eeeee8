//! The client's TCP connection.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::{watch, Mutex};
use vcc_protocol::{
    classify, decode_relay, decode_request, encode_relay_as, encode_request,
    relay_body_len, Frame, FrameKind, MessageType, ProtocolError, RawFrame,
    MAGIC_SIZE, RELAY_HEADER_SIZE, REQUEST_SIZE,
};

use crate::TransportError;

/// How often [`Connection::wait_until_reply`] re-checks the pending flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a [`Connection::wait_until_reply`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Some frame was received after the wait started.
    Replied,
    /// The connection was cancelled or closed first.
    Cancelled,
}

/// A live connection to a VCC server.
///
/// Wrap it in an `Arc` to share it between the receive loop and the input
/// loop.
pub struct Connection {
    peer: SocketAddr,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    pending_reply: AtomicBool,
    closed: AtomicBool,
    cancel: watch::Sender<bool>,
    poll_interval: Duration,
}

impl Connection {
    /// Connects to `addr:port` from an ephemeral local port.
    ///
    /// The socket family follows the address: an IPv6 literal gets an IPv6
    /// socket. Name resolution is the caller's job.
    pub async fn connect(
        addr: IpAddr,
        port: u16,
    ) -> Result<Self, TransportError> {
        let (socket, local) = match addr {
            IpAddr::V4(_) => (
                TcpSocket::new_v4(),
                SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            ),
            IpAddr::V6(_) => (
                TcpSocket::new_v6(),
                SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
            ),
        };
        let socket = socket.map_err(TransportError::ConnectFailed)?;
        socket.bind(local).map_err(TransportError::ConnectFailed)?;

        let stream = socket
            .connect(SocketAddr::new(addr, port))
            .await
            .map_err(TransportError::ConnectFailed)?;

        Self::from_stream(stream)
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        let peer = stream.peer_addr().map_err(TransportError::ConnectFailed)?;
        let (reader, writer) = stream.into_split();
        let (cancel, _) = watch::channel(false);

        tracing::debug!(%peer, "connected");

        Ok(Self {
            peer,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            pending_reply: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            cancel,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Sets the poll interval used by [`wait_until_reply`](Self::wait_until_reply).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The server's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    /// Encodes and sends one request frame.
    ///
    /// The 512 bytes go out under the writer lock in a single
    /// `write_all`, so concurrent senders never interleave.
    pub async fn send(
        &self,
        kind: MessageType,
        uid: i32,
        session: i32,
        flags: i32,
        username: &str,
        message: &str,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let frame =
            encode_request(kind, uid, session, flags, username, message)?;

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&frame)
            .await
            .map_err(TransportError::SendFailed)?;

        tracing::trace!(%kind, session, "request sent");
        Ok(())
    }

    /// Encodes and sends one relay frame.
    ///
    /// Header and body are written back to back while holding the writer
    /// lock, so together they form one unit on the wire.
    pub async fn send_relay(
        &self,
        uid: i32,
        session: i32,
        username: &str,
        visible: &str,
        message: &str,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let (header, body) = encode_relay_as(
            MessageType::RelayMessage,
            uid,
            session,
            username,
            visible,
            message,
        )?;

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&header)
            .await
            .map_err(TransportError::SendFailed)?;
        writer
            .write_all(&body)
            .await
            .map_err(TransportError::SendFailed)?;

        tracing::trace!(session, bytes = header.len() + body.len(), "relay sent");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Receiving
    // -----------------------------------------------------------------------

    /// Reads exactly one frame.
    ///
    /// First the 4 magic bytes, then exactly the rest of that frame kind.
    /// Short reads are retried until the byte count is complete; nothing
    /// past the frame is consumed. Clears the pending-reply flag on
    /// success.
    ///
    /// # Errors
    /// - [`TransportError::ConnectionClosed`]: EOF between frames
    /// - [`TransportError::Protocol`]: bad magic, bad relay size, or EOF
    ///   in the middle of a frame
    pub async fn receive(&self) -> Result<(RawFrame, Frame), TransportError> {
        self.ensure_open()?;
        let mut reader = self.reader.lock().await;

        let mut magic = [0u8; MAGIC_SIZE];
        let got = read_full(&mut reader, &mut magic).await?;
        if got == 0 {
            return Err(TransportError::ConnectionClosed(
                "server closed the stream".into(),
            ));
        }
        if got < MAGIC_SIZE {
            return Err(truncated(MAGIC_SIZE, got));
        }

        let (raw, frame) = match classify(magic) {
            FrameKind::Request => {
                let mut bytes = [0u8; REQUEST_SIZE];
                bytes[..MAGIC_SIZE].copy_from_slice(&magic);
                let got = read_full(&mut reader, &mut bytes[MAGIC_SIZE..]).await?;
                if got < REQUEST_SIZE - MAGIC_SIZE {
                    return Err(truncated(REQUEST_SIZE, MAGIC_SIZE + got));
                }
                let request = decode_request(&bytes);
                (RawFrame::Request(bytes.to_vec()), Frame::Request(request))
            }
            FrameKind::Relay => {
                let mut header = [0u8; RELAY_HEADER_SIZE];
                header[..MAGIC_SIZE].copy_from_slice(&magic);
                let got = read_full(&mut reader, &mut header[MAGIC_SIZE..]).await?;
                if got < RELAY_HEADER_SIZE - MAGIC_SIZE {
                    return Err(truncated(RELAY_HEADER_SIZE, MAGIC_SIZE + got));
                }

                let body_len = relay_body_len(&header)?;
                let mut body = vec![0u8; body_len];
                let got = read_full(&mut reader, &mut body).await?;
                if got < body_len {
                    return Err(truncated(
                        RELAY_HEADER_SIZE + body_len,
                        RELAY_HEADER_SIZE + got,
                    ));
                }
                let relay = decode_relay(&header, &body);
                (
                    RawFrame::Relay {
                        header: header.to_vec(),
                        body,
                    },
                    Frame::Relay(relay),
                )
            }
            FrameKind::Invalid(value) => {
                tracing::warn!(peer = %self.peer, magic = value, "invalid magic");
                return Err(ProtocolError::InvalidMagic(value).into());
            }
        };

        self.pending_reply.store(false, Ordering::SeqCst);
        Ok((raw, frame))
    }

    // -----------------------------------------------------------------------
    // Reply waiting
    // -----------------------------------------------------------------------

    /// Blocks until the receive loop has processed another frame.
    ///
    /// Sets the pending-reply flag, then polls it every poll interval
    /// until [`receive`](Self::receive) clears it or the connection is
    /// cancelled.
    ///
    /// The flag is not tied to any request: whichever frame arrives next
    /// ends the wait, even if it answers something else. The protocol has
    /// no correlation id to do better.
    pub async fn wait_until_reply(&self) -> WaitOutcome {
        self.pending_reply.store(true, Ordering::SeqCst);
        let mut cancelled = self.cancel.subscribe();

        loop {
            if !self.pending_reply.load(Ordering::SeqCst) {
                return WaitOutcome::Replied;
            }
            if *cancelled.borrow_and_update() {
                return WaitOutcome::Cancelled;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = cancelled.changed() => {
                    if changed.is_err() {
                        return WaitOutcome::Cancelled;
                    }
                }
            }
        }
    }

    /// `true` while a [`wait_until_reply`](Self::wait_until_reply) is
    /// outstanding.
    pub fn is_reply_pending(&self) -> bool {
        self.pending_reply.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Wakes every pending and future reply wait with
    /// [`WaitOutcome::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// `true` once [`cancel`](Self::cancel) or [`close`](Self::close) ran.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Cancels waiters and shuts the socket down.
    ///
    /// Only the first call does anything; later calls return `Ok(())`.
    pub async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.cancel();

        let result = self.writer.lock().await.shutdown().await;
        tracing::debug!(peer = %self.peer, "connection closed");

        match result {
            Ok(()) => Ok(()),
            // The peer may already be gone; the socket is released either way.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    /// `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Reads until `buf` is full or the stream ends. Returns the bytes read.
async fn read_full(
    reader: &mut OwnedReadHalf,
    buf: &mut [u8],
) -> Result<usize, TransportError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn truncated(expected: usize, actual: usize) -> TransportError {
    ProtocolError::Truncated { expected, actual }.into()
}
