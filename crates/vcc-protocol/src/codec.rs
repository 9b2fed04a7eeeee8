//! Encoding and decoding of wire frames.
//!
//! Everything here is a pure function over byte slices. The transport
//! layer decides how many bytes to read; this module only interprets
//! them.
//!
//! Two rules hold for every decoder:
//!
//! - **Text never fails.** Fields are cut at the first NUL. Bytes that are
//!   not valid UTF-8 are rendered with ASCII escapes (`\xff`) instead of
//!   returning an error, so a peer with a different encoding can't take
//!   the client down.
//! - **Integers never fail.** A 4-byte field that decodes to a value
//!   outside the `i32` range yields `-1`.

use crate::{
    FrameKind, MessageType, ProtocolError, Relay, Request, MAGIC_SIZE,
    MAX_RELAY_SIZE, MESSAGE_SIZE, RELAY_HEADER_SIZE, RELAY_MAGIC,
    REQUEST_MAGIC, REQUEST_SIZE, USERNAME_SIZE,
};

// Field offsets shared by both frames.
const TYPE_OFFSET: usize = 4;
const USERNAME_OFFSET: usize = 20;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Tells which frame starts with these 4 bytes.
pub fn classify(prefix: [u8; MAGIC_SIZE]) -> FrameKind {
    match u32::from_be_bytes(prefix) {
        REQUEST_MAGIC => FrameKind::Request,
        RELAY_MAGIC => FrameKind::Relay,
        other => FrameKind::Invalid(other),
    }
}

// ---------------------------------------------------------------------------
// Request frames
// ---------------------------------------------------------------------------

/// Encodes a 512-byte request frame.
///
/// # Errors
/// - [`ProtocolError::NegativeField`] if the type code, `uid`, `session`
///   or `flags` is negative
/// - [`ProtocolError::FieldTooLong`] if `username` or `message` does not
///   fit its field with a NUL terminator
///
/// Every field is checked before anything is written.
pub fn encode_request(
    kind: MessageType,
    uid: i32,
    session: i32,
    flags: i32,
    username: &str,
    message: &str,
) -> Result<Vec<u8>, ProtocolError> {
    check_int("type", kind.code())?;
    check_int("uid", uid)?;
    check_int("session", session)?;
    check_int("flags", flags)?;
    check_text("username", username, USERNAME_SIZE)?;
    check_text("message", message, MESSAGE_SIZE)?;

    let mut buf = Vec::with_capacity(REQUEST_SIZE);
    buf.extend_from_slice(&REQUEST_MAGIC.to_be_bytes());
    buf.extend_from_slice(&kind.code().to_be_bytes());
    buf.extend_from_slice(&uid.to_be_bytes());
    buf.extend_from_slice(&session.to_be_bytes());
    buf.extend_from_slice(&flags.to_be_bytes());
    put_text(&mut buf, username, USERNAME_SIZE);
    put_text(&mut buf, message, MESSAGE_SIZE);

    debug_assert_eq!(buf.len(), REQUEST_SIZE);
    Ok(buf)
}

/// Decodes a 512-byte request frame.
///
/// The magic is not checked here; the reader has already called
/// [`classify`] on it.
pub fn decode_request(raw: &[u8; REQUEST_SIZE]) -> Request {
    let message_offset = USERNAME_OFFSET + USERNAME_SIZE;
    Request {
        kind: MessageType::from_code(int_at(raw, TYPE_OFFSET)),
        uid: int_at(raw, 8),
        session: int_at(raw, 12),
        flags: int_at(raw, 16),
        username: decode_text(&raw[USERNAME_OFFSET..message_offset]),
        message: decode_text(&raw[message_offset..]),
    }
}

// ---------------------------------------------------------------------------
// Relay frames
// ---------------------------------------------------------------------------

/// Encodes a relay as `(header, body)` using [`MessageType::RelayMessage`].
///
/// An empty `visible` means the receiver shows the sender's name.
///
/// # Errors
/// Returns [`ProtocolError::NegativeField`] for a negative `uid` or
/// `session`, and [`ProtocolError::FieldTooLong`] for an oversized name or
/// a message that would push the total size past [`MAX_RELAY_SIZE`].
pub fn encode_relay(
    uid: i32,
    session: i32,
    username: &str,
    visible: &str,
    message: &str,
) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    encode_relay_as(
        MessageType::RelayMessage,
        uid,
        session,
        username,
        visible,
        message,
    )
}

/// Like [`encode_relay`], with an explicit relay type.
pub fn encode_relay_as(
    kind: MessageType,
    uid: i32,
    session: i32,
    username: &str,
    visible: &str,
    message: &str,
) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    check_int("type", kind.code())?;
    check_int("uid", uid)?;
    check_int("session", session)?;
    check_text("username", username, USERNAME_SIZE)?;
    check_text("visible", visible, USERNAME_SIZE)?;
    check_text("message", message, MAX_RELAY_SIZE - RELAY_HEADER_SIZE)?;

    let mut body = Vec::with_capacity(message.len() + 1);
    body.extend_from_slice(message.as_bytes());
    body.push(0);

    // Bounded by MAX_RELAY_SIZE above, so it fits a u32.
    let total_size = (RELAY_HEADER_SIZE + body.len()) as u32;

    let mut header = Vec::with_capacity(RELAY_HEADER_SIZE);
    header.extend_from_slice(&RELAY_MAGIC.to_be_bytes());
    header.extend_from_slice(&kind.code().to_be_bytes());
    header.extend_from_slice(&total_size.to_be_bytes());
    header.extend_from_slice(&uid.to_be_bytes());
    header.extend_from_slice(&session.to_be_bytes());
    put_text(&mut header, username, USERNAME_SIZE);
    put_text(&mut header, visible, USERNAME_SIZE);

    debug_assert_eq!(header.len(), RELAY_HEADER_SIZE);
    Ok((header, body))
}

/// Reads the declared total size from a relay header and returns how many
/// body bytes follow it.
///
/// # Errors
/// Returns [`ProtocolError::InvalidRelaySize`] if the total is smaller than
/// the header itself or larger than [`MAX_RELAY_SIZE`].
pub fn relay_body_len(
    header: &[u8; RELAY_HEADER_SIZE],
) -> Result<usize, ProtocolError> {
    let size = u32::from_be_bytes(word_at(header, 8));
    let total = size as usize;
    if !(RELAY_HEADER_SIZE..=MAX_RELAY_SIZE).contains(&total) {
        return Err(ProtocolError::InvalidRelaySize {
            size,
            min: RELAY_HEADER_SIZE,
            max: MAX_RELAY_SIZE,
        });
    }
    Ok(total - RELAY_HEADER_SIZE)
}

/// Decodes a relay from its header and the body read after it.
pub fn decode_relay(header: &[u8; RELAY_HEADER_SIZE], body: &[u8]) -> Relay {
    let visible_offset = USERNAME_OFFSET + USERNAME_SIZE;
    Relay {
        kind: MessageType::from_code(int_at(header, TYPE_OFFSET)),
        total_size: u32::from_be_bytes(word_at(header, 8)),
        uid: int_at(header, 12),
        session: int_at(header, 16),
        username: decode_text(&header[USERNAME_OFFSET..visible_offset]),
        visible: decode_text(&header[visible_offset..]),
        message: decode_text(body),
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Decodes a NUL-padded text field.
///
/// Stops at the first NUL. Invalid UTF-8 comes back ASCII-escaped rather
/// than as an error.
pub fn decode_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let text = &field[..end];
    match std::str::from_utf8(text) {
        Ok(s) => s.to_owned(),
        Err(_) => text.escape_ascii().to_string(),
    }
}

/// Decodes a network-order integer, mapping anything outside `i32` to `-1`.
pub fn decode_int(bytes: [u8; 4]) -> i32 {
    i32::try_from(u32::from_be_bytes(bytes)).unwrap_or(-1)
}

/// Splits a payload of consecutive 32-byte name slots into names.
///
/// `count` comes from the reply header and is not trusted: at most as many
/// slots as the payload actually holds are decoded, and a negative count
/// yields nothing.
pub fn decode_name_slots(raw: &[u8], count: i32) -> Vec<String> {
    let count = usize::try_from(count).unwrap_or(0);
    raw.chunks_exact(USERNAME_SIZE)
        .take(count)
        .map(decode_text)
        .collect()
}

fn check_text(
    field: &'static str,
    text: &str,
    width: usize,
) -> Result<(), ProtocolError> {
    let actual = text.len() + 1;
    if actual > width {
        return Err(ProtocolError::FieldTooLong {
            field,
            max: width,
            actual,
        });
    }
    Ok(())
}

fn check_int(field: &'static str, value: i32) -> Result<(), ProtocolError> {
    if value < 0 {
        return Err(ProtocolError::NegativeField { field, value });
    }
    Ok(())
}

/// Appends `text` NUL-padded to `width`. Length was checked by the caller.
fn put_text(buf: &mut Vec<u8>, text: &str, width: usize) {
    let start = buf.len();
    buf.extend_from_slice(text.as_bytes());
    buf.resize(start + width, 0);
}

fn word_at(raw: &[u8], offset: usize) -> [u8; 4] {
    let mut word = [0u8; 4];
    if let Some(bytes) = raw.get(offset..offset + 4) {
        word.copy_from_slice(bytes);
    }
    word
}

fn int_at(raw: &[u8], offset: usize) -> i32 {
    decode_int(word_at(raw, offset))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn as_request(bytes: &[u8]) -> [u8; REQUEST_SIZE] {
        bytes.try_into().expect("request frame is 512 bytes")
    }

    fn as_header(bytes: &[u8]) -> [u8; RELAY_HEADER_SIZE] {
        bytes.try_into().expect("relay header is 84 bytes")
    }

    // =====================================================================
    // Classification
    // =====================================================================

    #[test]
    fn test_classify_request_magic() {
        assert_eq!(classify(REQUEST_MAGIC.to_be_bytes()), FrameKind::Request);
    }

    #[test]
    fn test_classify_relay_magic() {
        assert_eq!(classify(RELAY_MAGIC.to_be_bytes()), FrameKind::Relay);
    }

    #[test]
    fn test_classify_other_values_are_invalid() {
        for value in [0u32, 1, 0xdead_beef, REQUEST_MAGIC.swap_bytes()] {
            assert_eq!(
                classify(value.to_be_bytes()),
                FrameKind::Invalid(value)
            );
        }
    }

    #[test]
    fn test_classify_reads_network_order() {
        // Little-endian bytes of the request magic must not match.
        let le = REQUEST_MAGIC.to_le_bytes();
        assert!(matches!(classify(le), FrameKind::Invalid(_)));
    }

    // =====================================================================
    // Request frames
    // =====================================================================

    #[test]
    fn test_chat_send_scenario() {
        let bytes =
            encode_request(MessageType::ChatSend, 0, 0, 0, "alice", "hi")
                .unwrap();
        assert_eq!(bytes.len(), REQUEST_SIZE);

        let req = decode_request(&as_request(&bytes));
        assert_eq!(req.kind, MessageType::ChatSend);
        assert_eq!(req.username, "alice");
        assert_eq!(req.message, "hi");
    }

    #[test]
    fn test_request_round_trip_preserves_fields() {
        let cases = [
            (MessageType::Login, 0, 0, 0, "", ""),
            (MessageType::JoinSession, 17, 3, 1, "bob", "ignored"),
            (MessageType::Other(42), i32::MAX, 0, 7, "名前", "你好，世界"),
        ];
        for (kind, uid, session, flags, username, message) in cases {
            let bytes =
                encode_request(kind, uid, session, flags, username, message)
                    .unwrap();
            let req = decode_request(&as_request(&bytes));
            assert_eq!(req.kind, kind);
            assert_eq!(req.uid, uid);
            assert_eq!(req.session, session);
            assert_eq!(req.flags, flags);
            assert_eq!(req.username, username);
            assert_eq!(req.message, message);
        }
    }

    #[test]
    fn test_request_integers_are_big_endian() {
        let bytes =
            encode_request(MessageType::ListUsers, 0x0102, 5, 0, "", "")
                .unwrap();
        assert_eq!(&bytes[0..4], &REQUEST_MAGIC.to_be_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 3]);
        assert_eq!(&bytes[8..12], &[0, 0, 1, 2]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 5]);
    }

    #[test]
    fn test_longest_fields_fit() {
        let username = "u".repeat(USERNAME_SIZE - 1);
        let message = "m".repeat(MESSAGE_SIZE - 1);
        let bytes = encode_request(
            MessageType::ChatSend,
            0,
            0,
            0,
            &username,
            &message,
        )
        .unwrap();
        let req = decode_request(&as_request(&bytes));
        assert_eq!(req.username, username);
        assert_eq!(req.message, message);
    }

    #[test]
    fn test_username_of_32_bytes_is_rejected() {
        let username = "u".repeat(USERNAME_SIZE);
        let err =
            encode_request(MessageType::ChatSend, 0, 0, 0, &username, "")
                .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FieldTooLong {
                field: "username",
                max: 32,
                actual: 33
            }
        ));
    }

    #[test]
    fn test_message_longer_than_field_is_rejected() {
        let message = "m".repeat(MESSAGE_SIZE);
        let err =
            encode_request(MessageType::ChatSend, 0, 0, 0, "alice", &message)
                .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FieldTooLong { field: "message", .. }
        ));
    }

    #[test]
    fn test_multibyte_length_is_counted_in_bytes() {
        // 11 three-byte characters = 33 bytes, too long for the username.
        let username = "名".repeat(11);
        assert!(
            encode_request(MessageType::ChatSend, 0, 0, 0, &username, "")
                .is_err()
        );
    }

    #[test]
    fn test_negative_integers_are_rejected() {
        let err = encode_request(MessageType::QuitSession, 0, -3, 0, "a", "")
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::NegativeField { field: "session", value: -3 }
        ));

        assert!(encode_request(MessageType::Login, -1, 0, 0, "a", "").is_err());
        assert!(encode_request(MessageType::Login, 0, 0, i32::MIN, "a", "").is_err());
        assert!(encode_request(MessageType::Other(-5), 0, 0, 0, "a", "").is_err());
        assert!(encode_relay(-1, 0, "a", "", "m").is_err());
        assert!(encode_relay(0, -1, "a", "", "m").is_err());
    }

    #[test]
    fn test_invalid_utf8_is_escaped_not_an_error() {
        let mut bytes =
            encode_request(MessageType::ChatBroadcast, 0, 0, 0, "x", "x")
                .unwrap();
        bytes[USERNAME_OFFSET] = 0xff;
        bytes[USERNAME_OFFSET + 1] = b'a';
        let req = decode_request(&as_request(&bytes));
        assert_eq!(req.username, "\\xffa");
        assert_eq!(req.message, "x");
    }

    #[test]
    fn test_text_stops_at_first_nul() {
        assert_eq!(decode_text(b"ab\0cd\0"), "ab");
        assert_eq!(decode_text(b"\0abc"), "");
        assert_eq!(decode_text(b"full"), "full");
    }

    #[test]
    fn test_out_of_range_integer_decodes_to_sentinel() {
        let mut bytes =
            encode_request(MessageType::ChatBroadcast, 1, 2, 0, "a", "b")
                .unwrap();
        bytes[12..16].copy_from_slice(&0x8000_0000u32.to_be_bytes());
        let req = decode_request(&as_request(&bytes));
        assert_eq!(req.session, -1);
        assert_eq!(req.uid, 1);
    }

    #[test]
    fn test_decode_int() {
        assert_eq!(decode_int([0, 0, 0, 7]), 7);
        assert_eq!(decode_int([0x7f, 0xff, 0xff, 0xff]), i32::MAX);
        assert_eq!(decode_int([0xff, 0xff, 0xff, 0xff]), -1);
    }

    // =====================================================================
    // Relay frames
    // =====================================================================

    #[test]
    fn test_relay_scenario() {
        let (header, body) =
            encode_relay(0, 1, "alice", "", "hello world").unwrap();
        assert_eq!(header.len(), RELAY_HEADER_SIZE);
        assert_eq!(body, b"hello world\0");

        let header = as_header(&header);
        assert_eq!(relay_body_len(&header).unwrap(), body.len());

        let relay = decode_relay(&header, &body);
        assert_eq!(relay.kind, MessageType::RelayMessage);
        assert_eq!(relay.username, "alice");
        assert_eq!(relay.visible, "");
        assert_eq!(relay.message, "hello world");
        assert_eq!(relay.session, 1);
        assert_eq!(
            relay.total_size as usize,
            RELAY_HEADER_SIZE + "hello world".len() + 1
        );
    }

    #[test]
    fn test_relay_with_visible_and_uid() {
        let (header, body) = encode_relay_as(
            MessageType::RelayBroadcast,
            9,
            2,
            "alice",
            "carol",
            "psst",
        )
        .unwrap();
        let relay = decode_relay(&as_header(&header), &body);
        assert_eq!(relay.kind, MessageType::RelayBroadcast);
        assert_eq!(relay.uid, 9);
        assert_eq!(relay.visible, "carol");
        assert_eq!(relay.display_name(), "carol");
    }

    #[test]
    fn test_relay_rejects_long_visible_name() {
        let visible = "v".repeat(USERNAME_SIZE);
        assert!(matches!(
            encode_relay(0, 0, "alice", &visible, "hi"),
            Err(ProtocolError::FieldTooLong { field: "visible", .. })
        ));
    }

    #[test]
    fn test_relay_rejects_message_past_max_size() {
        let message = "m".repeat(MAX_RELAY_SIZE);
        assert!(matches!(
            encode_relay(0, 0, "alice", "", &message),
            Err(ProtocolError::FieldTooLong { field: "message", .. })
        ));
    }

    #[test]
    fn test_relay_body_len_rejects_size_below_header() {
        let (header, _) = encode_relay(0, 0, "a", "", "").unwrap();
        let mut header = as_header(&header);
        header[8..12].copy_from_slice(&10u32.to_be_bytes());
        assert!(matches!(
            relay_body_len(&header),
            Err(ProtocolError::InvalidRelaySize { size: 10, .. })
        ));
    }

    #[test]
    fn test_relay_body_len_rejects_huge_size() {
        let (header, _) = encode_relay(0, 0, "a", "", "").unwrap();
        let mut header = as_header(&header);
        header[8..12].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(relay_body_len(&header).is_err());
    }

    // =====================================================================
    // Name slots
    // =====================================================================

    #[test]
    fn test_name_slots() {
        let mut raw = vec![0u8; USERNAME_SIZE * 3];
        raw[..5].copy_from_slice(b"alice");
        raw[USERNAME_SIZE..USERNAME_SIZE + 3].copy_from_slice(b"bob");
        raw[USERNAME_SIZE * 2..USERNAME_SIZE * 2 + 5]
            .copy_from_slice(b"carol");

        assert_eq!(decode_name_slots(&raw, 2), vec!["alice", "bob"]);
        assert_eq!(decode_name_slots(&raw, 10).len(), 3);
        assert!(decode_name_slots(&raw, -1).is_empty());
    }
}
