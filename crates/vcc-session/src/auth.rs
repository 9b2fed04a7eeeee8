//! Login handshake.
//!
//! Logging in is one request and one reply:
//!
//! ```text
//! client                                 server
//!   │── CTL_LOGIN (username, password) ──→│
//!   │←──────── CTL_LOGIN (uid) ───────────│
//! ```
//!
//! A reply with uid `0` means the server rejected the credentials. The
//! login runs before the receive loop starts, so it reads the reply
//! directly instead of waiting for the loop.

use vcc_protocol::{Frame, MessageType, ProtocolError, PASSWORD_SIZE};

use crate::{SendRequest, Session, SessionError};

/// Logs `session`'s user in with `password` and records the user id.
///
/// Returns the user id on success.
///
/// # Errors
/// - [`SessionError::Protocol`]: the password does not fit its
///   [`PASSWORD_SIZE`] slot
/// - [`SessionError::UnexpectedReply`]: the first frame back was not a
///   login reply
/// - [`SessionError::LoginFailed`]: the reply carried no user id
pub async fn login(
    session: &Session,
    password: &str,
) -> Result<i32, SessionError> {
    if password.len() + 1 > PASSWORD_SIZE {
        return Err(ProtocolError::FieldTooLong {
            field: "password",
            max: PASSWORD_SIZE,
            actual: password.len() + 1,
        }
        .into());
    }

    session
        .send(SendRequest::new(MessageType::Login).message(password))
        .await?;
    tracing::debug!("login request sent");

    let (_, frame) = session.connection().receive().await?;
    let reply = match frame {
        Frame::Request(reply) if reply.kind == MessageType::Login => reply,
        Frame::Request(other) => {
            return Err(SessionError::UnexpectedReply(other.kind.to_string()));
        }
        Frame::Relay(relay) => {
            return Err(SessionError::UnexpectedReply(format!(
                "{} relay",
                relay.kind
            )));
        }
    };

    // Zero is "no such user / wrong password"; negative is a corrupted
    // field, which is no better.
    if reply.uid <= 0 {
        let username = session.username();
        tracing::warn!(%username, uid = reply.uid, "login rejected");
        return Err(SessionError::LoginFailed(username));
    }

    session.set_uid(reply.uid);
    tracing::info!(username = %session.username(), uid = reply.uid, "logged in");
    Ok(reply.uid)
}
