//! Core protocol types for the VCC wire format.
//!
//! Two frames travel on the wire, both with network-byte-order integers:
//!
//! ```text
//! Request (fixed 512 bytes)            Relay (84-byte header + body)
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │ magic      0x01328e22    │         │ magic      0x01328e36    │
//! │ type       4B            │         │ type       4B            │
//! │ uid        4B            │         │ total size 4B            │
//! │ session    4B            │         │ uid        4B            │
//! │ flags      4B            │         │ session    4B            │
//! │ username   32B NUL-pad   │         │ username   32B NUL-pad   │
//! │ message    460B NUL-pad  │         │ visible    32B NUL-pad   │
//! └──────────────────────────┘         ├──────────────────────────┤
//!                                      │ message bytes + one NUL  │
//!                                      └──────────────────────────┘
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Magic number that opens every [`Request`] frame.
pub const REQUEST_MAGIC: u32 = 0x0132_8e22;

/// Magic number that opens every [`Relay`] frame.
pub const RELAY_MAGIC: u32 = 0x0132_8e36;

/// Default server port.
pub const DEFAULT_PORT: u16 = 46;

/// Default server address.
pub const DEFAULT_SERVER: &str = "124.223.105.230";

/// Width of the leading magic field shared by both frames.
pub const MAGIC_SIZE: usize = 4;

/// Width of every username / visible-name field, terminator included.
pub const USERNAME_SIZE: usize = 32;

/// Longest password the server accepts (it travels in the message field).
pub const PASSWORD_SIZE: usize = 64;

/// Total size of a request frame.
pub const REQUEST_SIZE: usize = 512;

/// Width of the request message field: whatever the five integers and the
/// username leave over.
pub const MESSAGE_SIZE: usize = REQUEST_SIZE - 5 * 4 - USERNAME_SIZE;

/// Size of a relay header: five integers and two name fields.
pub const RELAY_HEADER_SIZE: usize = 5 * 4 + 2 * USERNAME_SIZE;

/// Largest relay total size a receiver will honor.
pub const MAX_RELAY_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The `type` field of a frame.
///
/// The server speaks a fixed set of codes. Anything else is carried as
/// [`MessageType::Other`] so that a newer server never crashes an older
/// client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client → server chat line (`MSG_SEND`).
    ChatSend,
    /// Server → client chat line (`MSG_NEW`).
    ChatBroadcast,
    /// List connected users (`CTL_USRS`).
    ListUsers,
    /// Login request and its reply (`CTL_LOGIN`).
    Login,
    /// Create a session (`CTL_NEWSE`).
    CreateSession,
    /// List session names (`CTL_SESS`).
    ListSessions,
    /// Join a session (`CTL_JOINS`).
    JoinSession,
    /// Fetch a user's info (`CTL_UINFO`).
    UserInfo,
    /// Increase a user's score (`SYS_SCRINC`).
    IncrementScore,
    /// Leave a session (`CTL_QUITS`).
    QuitSession,
    /// Fetch a session's name (`CTL_SENAME`).
    SessionName,
    /// Relay to one recipient (`REL_MSG`).
    RelayMessage,
    /// Relay broadcast (`REL_NEW`).
    RelayBroadcast,
    /// A code this client does not know.
    Other(i32),
}

impl MessageType {
    /// Maps a wire code to a message type.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::ChatSend,
            2 => Self::ChatBroadcast,
            3 => Self::ListUsers,
            4 => Self::Login,
            5 => Self::CreateSession,
            6 => Self::ListSessions,
            7 => Self::JoinSession,
            8 => Self::UserInfo,
            9 => Self::IncrementScore,
            10 => Self::QuitSession,
            11 => Self::SessionName,
            12 => Self::RelayMessage,
            13 => Self::RelayBroadcast,
            other => Self::Other(other),
        }
    }

    /// Returns the wire code.
    pub fn code(self) -> i32 {
        match self {
            Self::ChatSend => 1,
            Self::ChatBroadcast => 2,
            Self::ListUsers => 3,
            Self::Login => 4,
            Self::CreateSession => 5,
            Self::ListSessions => 6,
            Self::JoinSession => 7,
            Self::UserInfo => 8,
            Self::IncrementScore => 9,
            Self::QuitSession => 10,
            Self::SessionName => 11,
            Self::RelayMessage => 12,
            Self::RelayBroadcast => 13,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChatSend => f.write_str("MSG_SEND"),
            Self::ChatBroadcast => f.write_str("MSG_NEW"),
            Self::ListUsers => f.write_str("CTL_USRS"),
            Self::Login => f.write_str("CTL_LOGIN"),
            Self::CreateSession => f.write_str("CTL_NEWSE"),
            Self::ListSessions => f.write_str("CTL_SESS"),
            Self::JoinSession => f.write_str("CTL_JOINS"),
            Self::UserInfo => f.write_str("CTL_UINFO"),
            Self::IncrementScore => f.write_str("SYS_SCRINC"),
            Self::QuitSession => f.write_str("CTL_QUITS"),
            Self::SessionName => f.write_str("CTL_SENAME"),
            Self::RelayMessage => f.write_str("REL_MSG"),
            Self::RelayBroadcast => f.write_str("REL_NEW"),
            Self::Other(code) => write!(f, "TYPE_{code}"),
        }
    }
}

// ---------------------------------------------------------------------------
// FrameKind
// ---------------------------------------------------------------------------

/// Result of looking at the first 4 bytes of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A fixed-size request follows.
    Request,
    /// A relay header (and then a body) follows.
    Relay,
    /// Neither magic matched. Carries the value that was read.
    Invalid(u32),
}

// ---------------------------------------------------------------------------
// Decoded frames
// ---------------------------------------------------------------------------

/// A decoded request frame.
///
/// Text fields are already trimmed at their first NUL. Integers that did
/// not fit an `i32` after byte-order conversion hold `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: MessageType,
    pub uid: i32,
    pub session: i32,
    pub flags: i32,
    pub username: String,
    pub message: String,
}

/// A decoded relay frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    pub kind: MessageType,
    /// Header size plus body size, as declared on the wire.
    pub total_size: u32,
    /// Non-zero when the relay is addressed to one user only.
    pub uid: i32,
    pub session: i32,
    pub username: String,
    /// Display-name override. Empty means "same as `username`".
    pub visible: String,
    pub message: String,
}

impl Relay {
    /// The name to show for this relay: `visible` when set, otherwise the
    /// sender.
    pub fn display_name(&self) -> &str {
        if self.visible.is_empty() {
            &self.username
        } else {
            &self.visible
        }
    }
}

/// Either kind of decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Request(Request),
    Relay(Relay),
}

/// The undecoded bytes of one frame, exactly as read off the socket.
///
/// Some replies pack binary payloads into the message field (for example
/// the user list is a run of 32-byte name slots), so callers sometimes
/// need the raw bytes next to the decoded [`Frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    Request(Vec<u8>),
    Relay { header: Vec<u8>, body: Vec<u8> },
}

impl RawFrame {
    /// The raw message bytes: the 460-byte field of a request, or the body
    /// of a relay.
    pub fn message_field(&self) -> &[u8] {
        match self {
            Self::Request(bytes) => {
                let start = REQUEST_SIZE - MESSAGE_SIZE;
                bytes.get(start..).unwrap_or(&[])
            }
            Self::Relay { body, .. } => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magics_are_distinct() {
        assert_ne!(REQUEST_MAGIC, RELAY_MAGIC);
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(MESSAGE_SIZE, 460);
        assert_eq!(RELAY_HEADER_SIZE, 84);
    }

    #[test]
    fn test_message_type_codes_round_trip() {
        for code in 1..=13 {
            assert_eq!(MessageType::from_code(code).code(), code);
            assert!(!matches!(
                MessageType::from_code(code),
                MessageType::Other(_)
            ));
        }
    }

    #[test]
    fn test_unknown_code_is_other() {
        assert_eq!(MessageType::from_code(99), MessageType::Other(99));
        assert_eq!(MessageType::Other(99).code(), 99);
        assert_eq!(MessageType::Other(-1).to_string(), "TYPE_-1");
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(MessageType::ChatSend.to_string(), "MSG_SEND");
        assert_eq!(MessageType::RelayBroadcast.to_string(), "REL_NEW");
    }

    #[test]
    fn test_relay_display_name_falls_back_to_sender() {
        let mut relay = Relay {
            kind: MessageType::RelayMessage,
            total_size: 0,
            uid: 0,
            session: 0,
            username: "alice".into(),
            visible: String::new(),
            message: String::new(),
        };
        assert_eq!(relay.display_name(), "alice");
        relay.visible = "bob".into();
        assert_eq!(relay.display_name(), "bob");
    }

    #[test]
    fn test_raw_request_message_field_is_last_460_bytes() {
        let mut bytes = vec![0u8; REQUEST_SIZE];
        bytes[REQUEST_SIZE - MESSAGE_SIZE] = b'x';
        let raw = RawFrame::Request(bytes);
        assert_eq!(raw.message_field().len(), MESSAGE_SIZE);
        assert_eq!(raw.message_field()[0], b'x');
    }
}
