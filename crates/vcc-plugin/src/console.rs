//! Where output goes and where input comes from.
//!
//! The client never touches stdin or stdout directly. Everything it prints
//! goes through a [`Console`], and every line it reads comes from an
//! [`InputSource`]. The binary plugs in the terminal; tests plug in
//! [`BufferConsole`] and [`ScriptedInput`].

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Line-oriented output.
pub trait Console: Send + Sync {
    /// Prints one line of normal output.
    fn line(&self, text: &str);

    /// Prints one line of diagnostics (unknown command, bad argument...).
    fn error(&self, text: &str);

    /// Rings the terminal bell.
    fn bell(&self) {
        self.error("\x07");
    }
}

/// A [`Console`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every normal line printed so far.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    /// Every error line printed so far.
    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    /// `true` if some normal line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.lines).iter().any(|l| l.contains(needle))
    }
}

impl Console for BufferConsole {
    fn line(&self, text: &str) {
        lock(&self.lines).push(text.to_owned());
    }

    fn error(&self, text: &str) {
        lock(&self.errors).push(text.to_owned());
    }
}

// ---------------------------------------------------------------------------
// InputSource
// ---------------------------------------------------------------------------

/// Interactive line input.
///
/// `#[async_trait]` keeps the trait usable as `&dyn InputSource`, which is
/// how command handlers receive it.
#[async_trait]
pub trait InputSource: Send + Sync {
    /// Shows `prompt` and reads one line without its line ending.
    ///
    /// Returns `Ok(None)` at end of input.
    async fn next_line(&self, prompt: &str) -> io::Result<Option<String>>;
}

/// An [`InputSource`] that replays a fixed list of lines, then reports end
/// of input.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Mutex::new(lines.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// The prompts shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// How many lines are still queued.
    pub fn remaining(&self) -> usize {
        lock(&self.lines).len()
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn next_line(&self, prompt: &str) -> io::Result<Option<String>> {
        lock(&self.prompts).push(prompt.to_owned());
        Ok(lock(&self.lines).pop_front())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_console_separates_streams() {
        let console = BufferConsole::new();
        console.line("hello");
        console.error("oops");
        console.bell();

        assert_eq!(console.lines(), vec!["hello"]);
        assert_eq!(console.errors(), vec!["oops", "\x07"]);
        assert!(console.contains("ell"));
    }

    #[tokio::test]
    async fn test_scripted_input_replays_then_ends() {
        let input = ScriptedInput::new(["one", "two"]);

        assert_eq!(input.next_line("> ").await.unwrap().as_deref(), Some("one"));
        assert_eq!(input.next_line("? ").await.unwrap().as_deref(), Some("two"));
        assert_eq!(input.next_line("> ").await.unwrap(), None);
        assert_eq!(input.prompts(), vec!["> ", "? ", "> "]);
        assert_eq!(input.remaining(), 0);
    }
}
