//! `cqd`: a distress call.
//!
//! `-cqd [text]` sends a chat line of the form `-cqd#<text>\n`. Clients with
//! the plugin loaded show it as an alert instead of a normal message.

use std::sync::Arc;

use async_trait::async_trait;
use vcc_protocol::{MessageType, Request};
use vcc_session::SendRequest;

use crate::{Command, CommandContext, CommandError, Console, Flow, Plugin};

const PREFIX: &str = "-cqd#";

/// Sends and renders CQD alerts.
#[derive(Debug, Default)]
pub struct CqdPlugin;

impl Plugin for CqdPlugin {
    fn name(&self) -> &str {
        "cqd"
    }

    fn on_receive(&self, request: Request, console: &dyn Console) -> Option<Request> {
        match request.message.strip_prefix(PREFIX) {
            Some(text) => {
                let text = text.strip_suffix('\n').unwrap_or(text);
                console.line(&format!("CQD {} send {text}.", request.username));
                None
            }
            None => Some(request),
        }
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![Arc::new(Cqd)]
    }
}

struct Cqd;

#[async_trait]
impl Command for Cqd {
    fn name(&self) -> &str {
        "-cqd"
    }

    fn help(&self) -> &str {
        "Send a \"cqd\" alert"
    }

    async fn run(
        &self,
        ctx: &CommandContext<'_>,
        args: &[String],
    ) -> Result<Flow, CommandError> {
        let text = args.first().map_or("CQD", String::as_str);
        ctx.session
            .send(
                SendRequest::new(MessageType::ChatSend)
                    .message(format!("{PREFIX}{text}\n")),
            )
            .await?;
        Ok(Flow::Continue)
    }
}
