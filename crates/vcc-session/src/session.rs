//! Session types: the client-side state that travels with a connection.
//!
//! The server is stateful too, but it never tells the client "you are now
//! in session 3". The client tracks that itself and stamps it into every
//! request it sends, so this state has to stay in step with the commands
//! the user runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vcc_protocol::MessageType;
use vcc_transport::{Connection, WaitOutcome};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The mutable part of a session.
///
/// `Clone` + `PartialEq` let callers take a snapshot and compare it later,
/// for example to check that a failed command changed nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// The name this client logged in as.
    pub username: String,

    /// The session new chat lines go to. `0` is the lobby.
    pub session: i32,

    /// The user id from the login reply. `0` until logged in.
    pub uid: i32,

    /// The user's level, learned from a user-info reply about ourselves.
    pub level: i32,

    /// Session names from the last list-sessions reply, in server order.
    ///
    /// Position `i` holds the name of session `i + 1`.
    pub session_names: Vec<String>,
}

impl SessionState {
    /// Creates the state for a not-yet-logged-in user in the lobby.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Looks up a session id by name in the cached list.
    ///
    /// Session ids are 1-based positions in the list. Returns `None` when
    /// the name isn't cached; the list may just be stale.
    pub fn session_id_by_name(&self, name: &str) -> Option<i32> {
        self.session_names
            .iter()
            .position(|n| n == name)
            .and_then(|i| i32::try_from(i + 1).ok())
    }
}

// ---------------------------------------------------------------------------
// SendRequest
// ---------------------------------------------------------------------------

/// A request to send, with the fields the session can fill in left
/// optional.
///
/// ```rust
/// use vcc_protocol::MessageType;
/// use vcc_session::SendRequest;
///
/// // Sent from the current user, in the current session.
/// let chat = SendRequest::new(MessageType::ChatSend).message("hi");
///
/// // The increment travels in the session field.
/// let incr = SendRequest::new(MessageType::IncrementScore)
///     .username("bob")
///     .session(5);
/// # let _ = (chat, incr);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub kind: MessageType,
    pub uid: i32,
    /// `None` means the current session id.
    pub session: Option<i32>,
    pub flags: i32,
    /// `None` means the current username.
    pub username: Option<String>,
    pub message: String,
}

impl SendRequest {
    /// Starts a request of the given type with every other field at its
    /// default.
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            uid: 0,
            session: None,
            flags: 0,
            username: None,
            message: String::new(),
        }
    }

    pub fn uid(mut self, uid: i32) -> Self {
        self.uid = uid;
        self
    }

    pub fn session(mut self, session: i32) -> Self {
        self.session = Some(session);
        self
    }

    pub fn flags(mut self, flags: i32) -> Self {
        self.flags = flags;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A connection plus the state that goes with it.
///
/// Shared between the receive loop and the input loop behind an `Arc`.
/// The state sits behind a `std::sync::Mutex`: every access is a short
/// read or write and the guard never lives across an `.await`.
pub struct Session {
    conn: Arc<Connection>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Creates a session for `username` over an open connection.
    pub fn new(conn: Arc<Connection>, username: impl Into<String>) -> Self {
        Self {
            conn,
            state: Mutex::new(SessionState::new(username)),
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Sends a request, filling in the current session id and username
    /// where `request` leaves them unset.
    pub async fn send(&self, request: SendRequest) -> Result<(), SessionError> {
        let (session, username) = {
            let state = self.state();
            (
                request.session.unwrap_or(state.session),
                request.username.unwrap_or_else(|| state.username.clone()),
            )
        };

        self.conn
            .send(
                request.kind,
                request.uid,
                session,
                request.flags,
                &username,
                &request.message,
            )
            .await?;
        Ok(())
    }

    /// Relays `message` as the current user in the current session.
    ///
    /// An empty `visible` shows the real username to receivers.
    pub async fn send_relay(
        &self,
        visible: &str,
        message: &str,
    ) -> Result<(), SessionError> {
        let (session, username) = {
            let state = self.state();
            (state.session, state.username.clone())
        };

        self.conn
            .send_relay(0, session, &username, visible, message)
            .await?;
        Ok(())
    }

    /// Waits until the receive loop has handled the next frame.
    pub async fn wait_until_reply(&self) -> WaitOutcome {
        self.conn.wait_until_reply().await
    }

    // -- State accessors --------------------------------------------------

    /// A copy of the whole state.
    pub fn snapshot(&self) -> SessionState {
        self.state().clone()
    }

    pub fn username(&self) -> String {
        self.state().username.clone()
    }

    pub fn session_id(&self) -> i32 {
        self.state().session
    }

    pub fn set_session_id(&self, session: i32) {
        self.state().session = session;
    }

    pub fn uid(&self) -> i32 {
        self.state().uid
    }

    pub fn set_uid(&self, uid: i32) {
        self.state().uid = uid;
    }

    pub fn level(&self) -> i32 {
        self.state().level
    }

    pub fn set_level(&self, level: i32) {
        self.state().level = level;
    }

    pub fn session_names(&self) -> Vec<String> {
        self.state().session_names.clone()
    }

    /// Replaces the cached session-name list.
    pub fn set_session_names(&self, names: Vec<String>) {
        self.state().session_names = names;
    }

    /// See [`SessionState::session_id_by_name`].
    pub fn session_id_by_name(&self, name: &str) -> Option<i32> {
        self.state().session_id_by_name(name)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // A panic while holding the guard can only leave a half-written
        // plain-data field behind, so keep going with what is there.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.conn.peer_addr())
            .field("state", &*self.state())
            .finish()
    }
}
