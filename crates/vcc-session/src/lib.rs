//! Session state for the VCC client.
//!
//! A [`Session`] is the client's record of who it is logged in as and
//! where it is talking:
//!
//! 1. **Identity**: username, user id and level, set by [`login`] and by
//!    user-info replies
//! 2. **Location**: the current session id, changed by the switch and join
//!    commands
//! 3. **Cache**: the last session-name list the server sent, used to turn
//!    names into ids
//!
//! # How it fits in the stack
//!
//! ```text
//! Commands and loops (above)  ← read and change the session state
//!     ↕
//! Session Layer (this crate)  ← fills in defaults, performs login
//!     ↕
//! Transport Layer (below)     ← moves frames over TCP
//! ```
//!
//! There is exactly one `Session` per connection. It is passed to command
//! handlers and hooks explicitly instead of living in a global.

mod auth;
mod error;
mod session;

pub use auth::login;
pub use error::SessionError;
pub use session::{SendRequest, Session, SessionState};
