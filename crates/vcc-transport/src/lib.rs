//! Transport layer for VCC.
//!
//! Provides [`Connection`]: one TCP stream to the server, speaking the
//! frames from `vcc-protocol`. A connection is shared between the receive
//! loop and the input loop, so every method takes `&self`:
//!
//! - writes go through one writer lock, so a frame (or a relay's header
//!   and body) is never interleaved with another writer's bytes
//! - reads go through one reader lock and always consume exactly one frame
//! - the pending-reply flag is an atomic that [`Connection::receive`]
//!   clears and [`Connection::wait_until_reply`] polls
//!
//! ```text
//! Unconnected ──connect()──→ Connected ──close()──→ Closed
//! ```
//!
//! There is no reconnection.

mod connection;
mod error;

pub use connection::{Connection, WaitOutcome, DEFAULT_POLL_INTERVAL};
pub use error::TransportError;
