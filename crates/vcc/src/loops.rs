//! The receive loop and the input loop.
//!
//! Both loops run in the same task under one `select!` (see
//! [`VccClient::run`](crate::VccClient::run)). They only give way to each
//! other at `.await` points, and routing a frame has none, so a frame is
//! fully handled before the input loop runs again. A command blocked in a
//! reply wait therefore resumes only after the reply has been printed or
//! recorded.

use vcc_plugin::{CommandContext, Console, Flow, PluginHost};
use vcc_protocol::{decode_name_slots, Frame, MessageType, RawFrame, Relay, Request};
use vcc_session::{SendRequest, Session, SessionError};
use vcc_transport::TransportError;

use crate::dispatcher::{split_command, Dispatcher};
use crate::display::{self, MessageFlags};
use crate::{ExitReason, VccError};

// ---------------------------------------------------------------------------
// Receive side
// ---------------------------------------------------------------------------

/// Receives and routes frames until the connection ends.
///
/// Returns `Ok(())` when the server closes the stream between frames.
/// Anything else that stops the loop is an error.
pub async fn recv_loop(
    session: &Session,
    plugins: &PluginHost,
    console: &dyn Console,
) -> Result<(), VccError> {
    loop {
        let (raw, frame) = match session.connection().receive().await {
            Ok(received) => received,
            Err(TransportError::ConnectionClosed(reason)) => {
                tracing::info!(%reason, "server closed the connection");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        route_frame(session, plugins, console, &raw, frame);
    }
}

/// Handles one received frame.
pub fn route_frame(
    session: &Session,
    plugins: &PluginHost,
    console: &dyn Console,
    raw: &RawFrame,
    frame: Frame,
) {
    match frame {
        Frame::Relay(relay) => show_relay(console, &relay),
        Frame::Request(request) => {
            let Some(request) = plugins.apply_receive(request, console) else {
                return;
            };
            if request.kind == MessageType::ChatBroadcast {
                show_broadcast(console, &request);
            } else {
                handle_reply(session, console, raw, &request);
            }
        }
    }
}

fn show_relay(console: &dyn Console, relay: &Relay) {
    let mut flags = MessageFlags::RELAY;
    if relay.uid != 0 {
        flags = flags | MessageFlags::ONLY_VISIBLE;
    }
    display::show_message(
        console,
        relay.session,
        relay.display_name(),
        &relay.message,
        flags,
    );
}

fn show_broadcast(console: &dyn Console, request: &Request) {
    if request.message == "CQD" {
        console.line(&display::cqd_alert(&request.username));
        return;
    }
    display::show_message(
        console,
        request.session,
        &request.username,
        &request.message,
        MessageFlags::NONE,
    );
}

/// The reply-type table: what to do with each kind of server answer.
pub fn handle_reply(
    session: &Session,
    console: &dyn Console,
    raw: &RawFrame,
    reply: &Request,
) {
    match reply.kind {
        // Name lists: `uid` says how many 32-byte slots are filled.
        MessageType::ListUsers => {
            for name in decode_name_slots(raw.message_field(), reply.uid) {
                console.line(&name);
            }
        }
        MessageType::ListSessions => {
            let names = decode_name_slots(raw.message_field(), reply.uid);
            for name in &names {
                console.line(name);
            }
            session.set_session_names(names);
        }
        MessageType::UserInfo => {
            // The level comes back in `uid`.
            let user = if reply.username.is_empty() {
                &reply.message
            } else {
                &reply.username
            };
            if *user == session.username() {
                session.set_level(reply.uid);
            }
            console.line(&format!("{user}: lvl{:02}", reply.uid));
        }
        MessageType::SessionName => {
            console.line(&format!(
                "{} {}",
                display::session_tag(reply.session),
                reply.message
            ));
        }
        MessageType::Login => console.line(&format!("logged in as uid {}", reply.uid)),
        MessageType::CreateSession => console.line(&format!(
            "created session {}",
            display::session_tag(reply.session)
        )),
        MessageType::JoinSession => console.line(&format!(
            "joined session {}",
            display::session_tag(reply.session)
        )),
        MessageType::QuitSession => console.line(&format!(
            "left session {}",
            display::session_tag(reply.session)
        )),
        MessageType::IncrementScore => {
            console.line(&format!("score of {} increased", reply.username))
        }
        other => {
            tracing::warn!(kind = %other, "unknown response type, ignored");
        }
    }
}

// ---------------------------------------------------------------------------
// Input side
// ---------------------------------------------------------------------------

/// Reads lines and either runs them as commands or sends them as chat.
///
/// Ends with [`ExitReason::Quit`] after a command returns [`Flow::Exit`],
/// or [`ExitReason::EndOfInput`] when input runs out.
pub async fn input_loop(
    ctx: &CommandContext<'_>,
    dispatcher: &Dispatcher,
) -> Result<ExitReason, VccError> {
    loop {
        let prompt = display::prompt(
            &ctx.session.username(),
            ctx.session.session_id(),
            ctx.session.level(),
        );
        let Some(line) = ctx.input.next_line(&prompt).await.map_err(VccError::Input)? else {
            return Ok(ExitReason::EndOfInput);
        };
        if line.is_empty() {
            continue;
        }

        if split_command(&line).is_some() {
            if dispatcher.dispatch(ctx, &line).await? == Flow::Exit {
                return Ok(ExitReason::Quit);
            }
            continue;
        }

        send_chat(ctx, line).await?;
    }
}

/// Sends one chat line through the outgoing hooks, then echoes it.
async fn send_chat(ctx: &CommandContext<'_>, line: String) -> Result<(), VccError> {
    let Some(text) = ctx.plugins.apply_send(line) else {
        return Ok(());
    };

    let sent = ctx
        .session
        .send(SendRequest::new(MessageType::ChatSend).message(text.as_str()))
        .await;
    match sent {
        Ok(()) => {}
        // Too long for one request: tell the user, keep going.
        Err(SessionError::Transport(TransportError::Protocol(e))) => {
            ctx.console.error(&e.to_string());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    display::show_message(
        ctx.console,
        ctx.session.session_id(),
        &ctx.session.username(),
        &text,
        MessageFlags::NONE,
    );
    Ok(())
}
