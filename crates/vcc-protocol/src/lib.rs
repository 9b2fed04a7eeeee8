//! Wire protocol for VCC.
//!
//! This crate defines the two frames that client and server exchange:
//!
//! - **Types** ([`Request`], [`Relay`], [`MessageType`], [`FrameKind`]):
//!   the decoded structures and the layout constants.
//! - **Codec** ([`encode_request`], [`decode_request`], [`encode_relay`],
//!   [`decode_relay`], [`classify`]): pure functions between those
//!   structures and raw bytes. No I/O happens here.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   while validating a frame header.
//!
//! # Architecture
//!
//! ```text
//! Transport (socket bytes) → Protocol (Request / Relay) → Session (user context)
//! ```
//!
//! Both frames start with a 4-byte magic number. Reading those 4 bytes
//! first and passing them to [`classify`] tells the reader how many more
//! bytes belong to the frame.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{
    classify, decode_int, decode_name_slots, decode_relay, decode_request,
    decode_text, encode_relay, encode_relay_as, encode_request,
    relay_body_len,
};
pub use error::ProtocolError;
pub use types::{
    Frame, FrameKind, MessageType, RawFrame, Relay, Request,
    DEFAULT_PORT, DEFAULT_SERVER, MAGIC_SIZE, MAX_RELAY_SIZE, MESSAGE_SIZE,
    PASSWORD_SIZE, RELAY_HEADER_SIZE, RELAY_MAGIC, REQUEST_MAGIC,
    REQUEST_SIZE, USERNAME_SIZE,
};
