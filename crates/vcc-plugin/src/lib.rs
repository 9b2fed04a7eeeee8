//! Plugins and commands for the VCC client.
//!
//! # Key types
//!
//! - [`Plugin`]: the trait add-ons implement (hooks and commands)
//! - [`PluginHost`]: runs the hook chain and holds the loaded plugins
//! - [`PluginCatalog`]: the plugins that can be loaded by name
//! - [`Command`]: one `-name` command, built-in or from a plugin
//! - [`Console`] / [`InputSource`]: the client's output and input
//!
//! # Built-in plugins
//!
//! - `ban`: mute users with `-ban` / `-unban`
//! - `cqd`: send and show `-cqd` alerts
//! - `beep`: ring the bell on every incoming message

mod builtin;
mod command;
mod console;
mod error;
mod host;
mod plugin;

pub use builtin::{BanPlugin, BeepPlugin, CqdPlugin};
pub use command::{parse_number, Command, CommandContext, CommandLookup, Flow};
pub use console::{BufferConsole, Console, InputSource, ScriptedInput};
pub use error::{CommandError, PluginError, ProviderLoadError};
pub use host::{PluginCatalog, PluginHost};
pub use plugin::Plugin;
