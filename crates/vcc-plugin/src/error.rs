//! Error types for plugins and commands.

use vcc_session::SessionError;
use vcc_transport::TransportError;

/// Errors from registering a plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// No plugin with this name is in the catalog.
    #[error("cannot find the plugin {0:?}")]
    UnknownProvider(String),

    /// A plugin with this name is already registered.
    #[error("plugin {0:?} is already loaded")]
    AlreadyLoaded(String),

    /// The plugin's `init()` refused to start.
    #[error("plugin {name:?} failed to initialize: {reason}")]
    InitFailed { name: String, reason: String },
}

/// A plugin that [`PluginHost::load`](crate::PluginHost::load) skipped.
///
/// Loading carries on past these; the caller decides how loudly to
/// report them.
#[derive(Debug, thiserror::Error)]
#[error("skipping plugin {name:?}: {source}")]
pub struct ProviderLoadError {
    pub name: String,
    #[source]
    pub source: PluginError,
}

/// Errors from running a command.
///
/// Most of these are the user's mistake and end up as one line on the
/// error stream. Only a broken connection ([`is_fatal`](Self::is_fatal))
/// should stop the client.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No command by this name.
    #[error("Unknown command \"{0}\"")]
    Unknown(String),

    /// A required argument was neither given nor typed before input ended.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// An argument that should be a number wasn't.
    #[error("invalid {name}: {value:?} is not a number")]
    InvalidNumber { name: &'static str, value: String },

    /// Reading a prompted argument failed.
    #[error("reading input failed: {0}")]
    Input(#[source] std::io::Error),

    /// Sending the request failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Loading a plugin failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl CommandError {
    /// `true` when the connection underneath is unusable.
    ///
    /// A field that could not be encoded (too long, or a negative number)
    /// is the user's problem, not the connection's, so it does not count.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Session(SessionError::Transport(e)) => !matches!(
                e,
                TransportError::Protocol(
                    vcc_protocol::ProtocolError::FieldTooLong { .. }
                        | vcc_protocol::ProtocolError::NegativeField { .. }
                )
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcc_protocol::ProtocolError;

    #[test]
    fn test_unknown_command_message() {
        let err = CommandError::Unknown("-bogus".into());
        assert_eq!(err.to_string(), "Unknown command \"-bogus\"");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_oversized_field_is_not_fatal() {
        let err = CommandError::Session(SessionError::Transport(
            TransportError::Protocol(ProtocolError::FieldTooLong {
                field: "message",
                max: 460,
                actual: 500,
            }),
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_negative_field_is_not_fatal() {
        let err = CommandError::Session(SessionError::Transport(
            TransportError::Protocol(ProtocolError::NegativeField {
                field: "session",
                value: -1,
            }),
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_closed_connection_is_fatal() {
        let err =
            CommandError::Session(SessionError::Transport(TransportError::Closed));
        assert!(err.is_fatal());
    }
}
