//! The `Plugin` trait: the extension point for client add-ons.
//!
//! A plugin can do three things, all optional:
//!
//! - rewrite or drop chat lines on their way out ([`Plugin::on_send`])
//! - rewrite or drop requests on their way in ([`Plugin::on_receive`])
//! - add commands ([`Plugin::commands`])
//!
//! The host calls these at the right time; a plugin only overrides the
//! ones it needs.

use std::sync::Arc;

use vcc_protocol::Request;

use crate::{Command, Console, PluginError};

/// A client add-on.
///
/// Hooks return `None` to drop the message. A dropped message goes no
/// further: later plugins don't see it, and it is neither sent nor shown.
pub trait Plugin: Send + Sync {
    /// The name the plugin is loaded by.
    fn name(&self) -> &str;

    /// Called once when the plugin is registered.
    ///
    /// Returning `Err` keeps the plugin out; other plugins still load.
    /// Default: nothing to set up.
    fn init(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Outgoing chat hook. Default: pass through.
    fn on_send(&self, text: String) -> Option<String> {
        Some(text)
    }

    /// Incoming request hook. Default: pass through.
    ///
    /// `console` is there for plugins that print something of their own
    /// (an alert, a bell) instead of letting the message through.
    fn on_receive(
        &self,
        request: Request,
        _console: &dyn Console,
    ) -> Option<Request> {
        Some(request)
    }

    /// Commands this plugin adds. Asked once, at registration.
    fn commands(&self) -> Vec<Arc<dyn Command>> {
        Vec::new()
    }

    /// Called once when the client exits. Default: no-op.
    fn shutdown(&self) {}
}
