//! # VCC
//!
//! Client core for the VCC chat protocol.
//!
//! A client connects to one server over TCP, logs in, and then runs two
//! loops side by side: one receives and prints whatever the server sends,
//! the other reads the user's lines and turns them into chat messages or
//! `-commands`. Plugins can filter traffic in both directions and add
//! commands of their own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vcc::prelude::*;
//!
//! # async fn demo() -> Result<(), VccError> {
//! let client = VccClient::builder()
//!     .username("alice")
//!     .plugins(["ban", "cqd"])
//!     .connect()
//!     .await?;
//!
//! let console = BufferConsole::new();
//! let input = ScriptedInput::new(["hello", "-quit"]);
//! let reason = client.run("secret", &console, &input).await?;
//! assert_eq!(reason, ExitReason::Quit);
//! # Ok(())
//! # }
//! ```

mod client;
mod commands;
mod config;
mod dispatcher;
mod display;
mod error;
mod loops;

pub use client::{ExitReason, VccClient, VccClientBuilder};
pub use commands::Builtin;
pub use config::{ClientConfig, DEFAULT_SERVER_ADDR};
pub use dispatcher::{split_command, Dispatcher, COMMAND_PREFIX};
pub use display::{format_message, prompt, timestamp, MessageFlags};
pub use error::VccError;

// Sub-crates, for callers that need the lower layers directly.
pub use vcc_plugin as plugin;
pub use vcc_protocol as protocol;
pub use vcc_session as session;
pub use vcc_transport as transport;

/// Everything a typical client binary needs.
pub mod prelude {
    pub use crate::{ClientConfig, ExitReason, VccClient, VccClientBuilder, VccError};
    pub use vcc_plugin::{
        BufferConsole, Command, CommandContext, Console, Flow, InputSource, Plugin,
        PluginCatalog, ScriptedInput,
    };
}
