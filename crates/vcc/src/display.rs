//! How messages and prompts look.
//!
//! Colors are the terminal's business; these functions only build the
//! plain text.
//!
//! ```text
//! [14:05] #003 alice@: hello
//! [14:05] #003 ghost@ (relay): boo
//! [14:06] #003 bob@ (relay, only visible): psst
//! lvl02 #003 alice$:
//! ```

use std::ops::BitOr;

use chrono::{DateTime, Local, TimeZone};
use vcc_plugin::Console;

// ---------------------------------------------------------------------------
// MessageFlags
// ---------------------------------------------------------------------------

/// Markers shown next to a message's sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFlags(u8);

impl MessageFlags {
    /// A plain chat message.
    pub const NONE: Self = Self(0);
    /// The message came in a relay frame.
    pub const RELAY: Self = Self(1);
    /// The relay was addressed to this user only.
    pub const ONLY_VISIBLE: Self = Self(1 << 1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MessageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// `HH:MM` in the given time's zone.
pub fn timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M").to_string()
}

/// `#003` style session tag.
pub fn session_tag(session: i32) -> String {
    format!("#{session:03}")
}

/// Formats one chat line.
pub fn format_message(
    time: &str,
    session: i32,
    username: &str,
    message: &str,
    flags: MessageFlags,
) -> String {
    let marker = match (
        flags.contains(MessageFlags::RELAY),
        flags.contains(MessageFlags::ONLY_VISIBLE),
    ) {
        (_, true) => " (relay, only visible)",
        (true, false) => " (relay)",
        (false, false) => "",
    };
    format!("[{time}] {} {username}@{marker}: {message}", session_tag(session))
}

/// Prints a chat line stamped with the current local time.
pub fn show_message(
    console: &dyn Console,
    session: i32,
    username: &str,
    message: &str,
    flags: MessageFlags,
) {
    let now = timestamp(&Local::now());
    console.line(&format_message(&now, session, username, message, flags));
}

/// The input prompt.
pub fn prompt(username: &str, session: i32, level: i32) -> String {
    format!("lvl{level:02} {} {username}$: ", session_tag(session))
}

/// The alert shown for a bare `CQD` broadcast.
pub fn cqd_alert(username: &str) -> String {
    format!("CQD {username} send CQD.")
}

/// One line of `-help` output.
pub fn help_line(name: &str, help: &str) -> String {
    format!("{name:<8} {help}")
}
