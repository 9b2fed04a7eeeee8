//! VCC terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the public server, asking for the user name
//! vcc
//!
//! # Connect somewhere else as alice, with the cqd plugin as well
//! vcc 127.0.0.1 --port 4600 --user alice --plugin ban --plugin cqd
//! ```

use std::io::{self, BufReader};
use std::net::IpAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vcc::prelude::*;
use vcc::protocol::DEFAULT_PORT;
use vcc::DEFAULT_SERVER_ADDR;

use crate::terminal::LineInput;

mod terminal;

/// VCC chat client
#[derive(Parser, Debug)]
#[command(name = "vcc")]
#[command(about = "Terminal client for the VCC chat protocol")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(default_value_t = DEFAULT_SERVER_ADDR)]
    ip: IpAddr,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// User name (asked for when missing)
    #[arg(short, long)]
    user: Option<String>,

    /// Plugin to load at start-up; repeat for more, in hook order
    #[arg(long = "plugin", default_value = "ban")]
    plugins: Vec<String>,

    /// How often a command waiting for its reply re-checks, in milliseconds
    #[arg(long, default_value = "100")]
    poll_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

// ---------------------------------------------------------------------------
// Terminal I/O
// ---------------------------------------------------------------------------

struct StdConsole;

impl Console for StdConsole {
    fn line(&self, text: &str) {
        println!("{text}");
    }

    fn error(&self, text: &str) {
        eprintln!("{text}");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match run(args).await {
        Ok(reason) => {
            tracing::info!(?reason, "client exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitReason, VccError> {
    let console = StdConsole;

    let username = match args.user {
        Some(user) => user,
        None => blocking(|| terminal::read_line("login as: "))
            .await?
            .unwrap_or_default(),
    };

    let client = VccClient::builder()
        .server(args.ip)
        .port(args.port)
        .username(username)
        .poll_interval(Duration::from_millis(args.poll_ms))
        .plugins(args.plugins)
        .connect()
        .await?;
    for skipped in client.load_errors() {
        console.error(&skipped.to_string());
    }

    let password = blocking(|| terminal::read_password("password: ")).await?;

    // Only now does the reader thread take over stdin; the prompts above
    // read it directly.
    let input = LineInput::spawn(BufReader::new(io::stdin())).map_err(VccError::Input)?;
    client.run(&password, &console, &input).await
}

/// Runs a blocking terminal read off the async threads.
async fn blocking<T, F>(read: F) -> Result<T, VccError>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(io::Error::other)
        .and_then(|result| result)
        .map_err(VccError::Input)
}
