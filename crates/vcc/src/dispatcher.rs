//! Command dispatch: turn a `-name arg arg` line into a command call.

use std::sync::Arc;

use vcc_plugin::{Command, CommandContext, CommandError, CommandLookup, Flow, PluginHost};

use crate::commands::Builtin;

/// The reserved first character of a command line.
pub const COMMAND_PREFIX: char = '-';

/// Splits a command line into its command token and arguments.
///
/// Returns `None` for lines that aren't commands.
pub fn split_command(line: &str) -> Option<(&str, Vec<String>)> {
    if !line.starts_with(COMMAND_PREFIX) {
        return None;
    }
    let mut tokens = line.split_whitespace();
    let name = tokens.next()?;
    Some((name, tokens.map(str::to_owned).collect()))
}

/// Maps command names to handlers: built-ins first, then whatever the
/// loaded plugins provide.
pub struct Dispatcher {
    builtins: Vec<Arc<dyn Command>>,
    plugins: Arc<PluginHost>,
}

impl Dispatcher {
    pub fn new(plugins: Arc<PluginHost>) -> Self {
        Self {
            builtins: Builtin::ALL
                .iter()
                .map(|b| Arc::new(*b) as Arc<dyn Command>)
                .collect(),
            plugins,
        }
    }

    /// Runs one command line.
    ///
    /// Mistakes (unknown command, bad argument) are printed to the error
    /// stream and come back as [`Flow::Continue`]. Only errors that leave
    /// the connection unusable are returned.
    pub async fn dispatch(
        &self,
        ctx: &CommandContext<'_>,
        line: &str,
    ) -> Result<Flow, CommandError> {
        match self.run(ctx, line).await {
            Ok(flow) => Ok(flow),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::debug!(%line, error = %e, "command failed");
                ctx.console.error(&e.to_string());
                Ok(Flow::Continue)
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch), but every error is returned.
    pub async fn run(
        &self,
        ctx: &CommandContext<'_>,
        line: &str,
    ) -> Result<Flow, CommandError> {
        let Some((name, args)) = split_command(line) else {
            return Err(CommandError::Unknown(line.to_owned()));
        };
        let command = self
            .find(name)
            .ok_or_else(|| CommandError::Unknown(name.to_owned()))?;

        tracing::debug!(command = %name, args = args.len(), "running command");
        command.run(ctx, &args).await
    }
}

impl CommandLookup for Dispatcher {
    fn find(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.builtins
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .or_else(|| self.plugins.command(name))
    }

    fn all(&self) -> Vec<Arc<dyn Command>> {
        let mut all = self.builtins.clone();
        all.extend(self.plugins.commands());
        all
    }
}
