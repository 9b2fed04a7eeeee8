//! Terminal input.
//!
//! Interactive lines come from a plain OS thread that reads stdin and hands
//! each line over a channel. Tokio's own stdin reads on the blocking pool,
//! and the runtime waits for that pool when it shuts down, so a read parked
//! at the prompt would keep the process alive until the user hit Enter.
//! A detached thread just dies with the process.

use std::io::{self, BufRead, IsTerminal, Write};
use std::thread;

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::sync::{mpsc, Mutex};
use vcc::prelude::*;

/// Lines read by a background thread.
pub struct LineInput {
    lines: Mutex<mpsc::Receiver<io::Result<String>>>,
}

impl LineInput {
    /// Starts the reader thread. It stops after end of input, after a read
    /// error (which is passed on), or once the receiver is gone.
    pub fn spawn<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        thread::Builder::new()
            .name("vcc-stdin".into())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        return;
                    }
                }
            })?;
        Ok(Self {
            lines: Mutex::new(rx),
        })
    }
}

#[async_trait]
impl InputSource for LineInput {
    async fn next_line(&self, prompt: &str) -> io::Result<Option<String>> {
        print_prompt(prompt)?;
        self.lines.lock().await.recv().await.transpose()
    }
}

fn print_prompt(prompt: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()
}

/// Prints `prompt` and reads one line, without its line ending.
///
/// Blocking; for use before [`LineInput`] owns stdin.
pub fn read_line(prompt: &str) -> io::Result<Option<String>> {
    print_prompt(prompt)?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let end = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(end);
    Ok(Some(line))
}

/// Reads a password without echoing it.
///
/// When stdin is not a terminal (piped input) this is a plain
/// [`read_line`].
pub fn read_password(prompt: &str) -> io::Result<String> {
    if !io::stdin().is_terminal() {
        return read_line(prompt).map(Option::unwrap_or_default);
    }

    print_prompt(prompt)?;
    terminal::enable_raw_mode()?;
    let raw = RawMode;

    let mut password = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        match password_key(&mut password, &key) {
            KeyOutcome::Pending => {}
            KeyOutcome::Done => break,
            KeyOutcome::Cancelled => {
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "password entry cancelled",
                ));
            }
        }
    }

    drop(raw);
    println!();
    Ok(password)
}

/// Leaves raw mode when dropped.
struct RawMode;

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Pending,
    Done,
    Cancelled,
}

/// Applies one key press to the password typed so far.
fn password_key(password: &mut String, key: &KeyEvent) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Pending;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        // Raw mode swallows SIGINT, so Ctrl-C arrives as a key.
        KeyCode::Char('c') if ctrl => KeyOutcome::Cancelled,
        KeyCode::Enter => KeyOutcome::Done,
        KeyCode::Backspace => {
            password.pop();
            KeyOutcome::Pending
        }
        KeyCode::Char(c) if !ctrl => {
            password.push(c);
            KeyOutcome::Pending
        }
        _ => KeyOutcome::Pending,
    }
}
