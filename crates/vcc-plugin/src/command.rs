//! The command trait and the context handlers run in.
//!
//! A command is what runs when the user types a line starting with `-`.
//! The client ships a set of built-in commands and plugins can add more;
//! both implement [`Command`] the same way.

use std::sync::Arc;

use async_trait::async_trait;
use vcc_session::Session;

use crate::{CommandError, Console, InputSource, PluginHost};

/// What the input loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input.
    Continue,
    /// Shut the client down in an orderly way.
    Exit,
}

/// A named command.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use vcc_plugin::{Command, CommandContext, CommandError, Flow};
///
/// /// Prints its arguments back.
/// struct Echo;
///
/// #[async_trait]
/// impl Command for Echo {
///     fn name(&self) -> &str {
///         "-echo"
///     }
///
///     fn help(&self) -> &str {
///         "Print the arguments"
///     }
///
///     async fn run(
///         &self,
///         ctx: &CommandContext<'_>,
///         args: &[String],
///     ) -> Result<Flow, CommandError> {
///         ctx.console.line(&args.join(" "));
///         Ok(Flow::Continue)
///     }
/// }
/// ```
#[async_trait]
pub trait Command: Send + Sync {
    /// The token that invokes the command, including the leading `-`.
    fn name(&self) -> &str;

    /// One line of help text.
    fn help(&self) -> &str;

    /// Runs the command with the tokens that followed its name.
    async fn run(
        &self,
        ctx: &CommandContext<'_>,
        args: &[String],
    ) -> Result<Flow, CommandError>;
}

/// Finds commands by name.
///
/// The dispatcher implements this so commands that run other commands
/// (`-help`, `-ml`) can see the full table: built-ins plus whatever
/// plugins are loaded at that moment.
pub trait CommandLookup: Send + Sync {
    fn find(&self, name: &str) -> Option<Arc<dyn Command>>;

    /// Every command, built-ins first.
    fn all(&self) -> Vec<Arc<dyn Command>>;
}

/// Everything a command handler may touch.
///
/// Handlers get their state handed to them here instead of reaching for
/// globals.
pub struct CommandContext<'a> {
    pub session: &'a Session,
    pub console: &'a dyn Console,
    pub input: &'a dyn InputSource,
    pub plugins: &'a PluginHost,
    pub commands: &'a dyn CommandLookup,
}

impl CommandContext<'_> {
    /// Returns `args[index]`, or prompts for it when it wasn't given.
    ///
    /// # Errors
    /// [`CommandError::MissingArgument`] when input ends at the prompt.
    pub async fn arg_or_prompt(
        &self,
        args: &[String],
        index: usize,
        name: &'static str,
        prompt: &str,
    ) -> Result<String, CommandError> {
        if let Some(arg) = args.get(index) {
            return Ok(arg.clone());
        }
        self.prompt(name, prompt).await
    }

    /// Reads one line at `prompt`.
    pub async fn prompt(
        &self,
        name: &'static str,
        prompt: &str,
    ) -> Result<String, CommandError> {
        self.input
            .next_line(prompt)
            .await
            .map_err(CommandError::Input)?
            .ok_or(CommandError::MissingArgument(name))
    }
}

/// Parses a numeric argument.
pub fn parse_number(name: &'static str, value: &str) -> Result<i32, CommandError> {
    value
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber {
            name,
            value: value.to_owned(),
        })
}
