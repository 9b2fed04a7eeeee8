//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means the bytes themselves are wrong: a field
//! that does not fit, or a header that breaks the framing rules. Text
//! that fails to decode is NOT an error here; it is rendered escaped.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A string does not fit its fixed-width field once NUL-terminated.
    ///
    /// Encoding never truncates. `actual` counts the terminator, so a
    /// 32-byte username against a 32-byte field reports `actual: 33`.
    #[error("{field} too long: {actual} bytes with terminator, field holds {max}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// An integer field was given a negative value.
    ///
    /// Integers go on the wire as unsigned 32-bit words, and the decoder
    /// reads anything above `i32::MAX` back as `-1`, so a negative value
    /// would not survive the trip.
    #[error("{field} must not be negative, got {value}")]
    NegativeField { field: &'static str, value: i32 },

    /// The leading 4 bytes match neither magic number.
    #[error("invalid magic number {0:#010x}")]
    InvalidMagic(u32),

    /// The stream ended in the middle of a frame.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A relay header declares a total size outside the accepted range.
    #[error("invalid relay size {size} (must be {min}..={max})")]
    InvalidRelaySize { size: u32, min: usize, max: usize },
}
