//! The built-in commands.
//!
//! Every command takes its arguments from the line when they're there and
//! prompts for them when they aren't. Commands that ask the server
//! something block until the receive loop has handled the next frame, so
//! the answer is on screen before the next prompt.

use async_trait::async_trait;
use vcc_plugin::{parse_number, Command, CommandContext, CommandError, Flow};
use vcc_protocol::MessageType;
use vcc_session::SendRequest;
use vcc_transport::WaitOutcome;

use crate::dispatcher::COMMAND_PREFIX;
use crate::display::{self, MessageFlags};

/// Ends `-ml` input.
const ML_FINISH: &str = "finish";

/// One built-in command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Help,
    Quit,
    ListUsers,
    NewSession,
    CurrentSession,
    Switch,
    ListSessions,
    UserInfo,
    SelfInfo,
    Increment,
    MultiLine,
    SendMessage,
    Relay,
    PluginInsert,
    PluginList,
    SessionName,
    SessionId,
    Join,
    QuitSession,
}

impl Builtin {
    /// All built-ins, in `-help` order.
    pub const ALL: [Builtin; 19] = [
        Self::Help,
        Self::Quit,
        Self::ListUsers,
        Self::NewSession,
        Self::CurrentSession,
        Self::Switch,
        Self::ListSessions,
        Self::UserInfo,
        Self::SelfInfo,
        Self::Increment,
        Self::MultiLine,
        Self::SendMessage,
        Self::Relay,
        Self::PluginInsert,
        Self::PluginList,
        Self::SessionName,
        Self::SessionId,
        Self::Join,
        Self::QuitSession,
    ];
}

#[async_trait]
impl Command for Builtin {
    fn name(&self) -> &str {
        match self {
            Self::Help => "-help",
            Self::Quit => "-quit",
            Self::ListUsers => "-ls",
            Self::NewSession => "-newse",
            Self::CurrentSession => "-currs",
            Self::Switch => "-swtch",
            Self::ListSessions => "-lsse",
            Self::UserInfo => "-uinfo",
            Self::SelfInfo => "-lself",
            Self::Increment => "-incr",
            Self::MultiLine => "-ml",
            Self::SendMessage => "-send",
            Self::Relay => "-rl",
            Self::PluginInsert => "-pins",
            Self::PluginList => "-pls",
            Self::SessionName => "-sname",
            Self::SessionId => "-sid",
            Self::Join => "-join",
            Self::QuitSession => "-quits",
        }
    }

    fn help(&self) -> &str {
        match self {
            Self::Help => "Show information about every command",
            Self::Quit => "Disconnect from the server and exit",
            Self::ListUsers => "List the users",
            Self::NewSession => "Create a new session",
            Self::CurrentSession => "Get the current session id",
            Self::Switch => "Switch session",
            Self::ListSessions => "List the sessions",
            Self::UserInfo => "Get user information",
            Self::SelfInfo => "Reload information about myself",
            Self::Increment => "Increase a user's score",
            Self::MultiLine => "Run several commands, one per line",
            Self::SendMessage => "Send a message (for -ml; not echoed)",
            Self::Relay => "Send a message under a visible name, or one starting with -",
            Self::PluginInsert => "Insert a plugin",
            Self::PluginList => "List the plugins that can be inserted",
            Self::SessionName => "Get a session's name",
            Self::SessionId => "Get a session's id from its name",
            Self::Join => "Join a session by name",
            Self::QuitSession => "Quit a session",
        }
    }

    async fn run(
        &self,
        ctx: &CommandContext<'_>,
        args: &[String],
    ) -> Result<Flow, CommandError> {
        match self {
            Self::Help => help(ctx, args),
            Self::Quit => {
                ctx.console.line("bye.");
                Ok(Flow::Exit)
            }
            Self::ListUsers => {
                request_and_wait(ctx, SendRequest::new(MessageType::ListUsers)).await
            }
            Self::NewSession => new_session(ctx, args).await,
            Self::CurrentSession => {
                ctx.console.line(&ctx.session.session_id().to_string());
                Ok(Flow::Continue)
            }
            Self::Switch => switch(ctx, args).await,
            Self::ListSessions => {
                request_and_wait(ctx, SendRequest::new(MessageType::ListSessions)).await
            }
            Self::UserInfo => {
                let user = ctx.arg_or_prompt(args, 0, "user", "Username: ").await?;
                request_and_wait(ctx, SendRequest::new(MessageType::UserInfo).message(user))
                    .await
            }
            Self::SelfInfo => {
                let me = ctx.session.username();
                request_and_wait(ctx, SendRequest::new(MessageType::UserInfo).message(me)).await
            }
            Self::Increment => increment(ctx, args).await,
            Self::MultiLine => multi_line(ctx).await,
            Self::SendMessage => {
                let message = if args.is_empty() {
                    ctx.prompt("message", "Message: ").await?
                } else {
                    args.join(" ")
                };
                ctx.session
                    .send(SendRequest::new(MessageType::ChatSend).message(message))
                    .await?;
                Ok(Flow::Continue)
            }
            Self::Relay => relay(ctx, args).await,
            Self::PluginInsert => {
                let name = ctx.arg_or_prompt(args, 0, "plugin", "Plugin: ").await?;
                ctx.plugins.insert(&name)?;
                Ok(Flow::Continue)
            }
            Self::PluginList => {
                for name in ctx.plugins.catalog().names() {
                    ctx.console.line(name);
                }
                Ok(Flow::Continue)
            }
            Self::SessionName => {
                let sid = ctx.arg_or_prompt(args, 0, "sid", "sid: ").await?;
                let sid = parse_number("sid", &sid)?;
                request_and_wait(ctx, SendRequest::new(MessageType::SessionName).session(sid))
                    .await
            }
            Self::SessionId => {
                let name = ctx.arg_or_prompt(args, 0, "name", "session name: ").await?;
                match resolve_session(ctx, &name).await? {
                    Some(id) => ctx.console.line(&id.to_string()),
                    None => ctx.console.line("No such session"),
                }
                Ok(Flow::Continue)
            }
            Self::Join => join(ctx, args).await,
            Self::QuitSession => quit_session(ctx, args).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn help(ctx: &CommandContext<'_>, args: &[String]) -> Result<Flow, CommandError> {
    let Some(wanted) = args.first() else {
        for command in ctx.commands.all() {
            ctx.console.line(&display::help_line(command.name(), command.help()));
        }
        return Ok(Flow::Continue);
    };

    // Accept both `-help ls` and `-help -ls`.
    let name = if wanted.starts_with(COMMAND_PREFIX) {
        wanted.clone()
    } else {
        format!("{COMMAND_PREFIX}{wanted}")
    };
    let command = ctx
        .commands
        .find(&name)
        .ok_or(CommandError::Unknown(name))?;
    ctx.console.line(&display::help_line(command.name(), command.help()));
    Ok(Flow::Continue)
}

async fn new_session(ctx: &CommandContext<'_>, args: &[String]) -> Result<Flow, CommandError> {
    let name = ctx
        .arg_or_prompt(args, 0, "name", "Name of new session: ")
        .await?;
    // The server reads the new session's name from the username field.
    ctx.session
        .send(SendRequest::new(MessageType::CreateSession).username(name))
        .await?;
    Ok(Flow::Continue)
}

async fn switch(ctx: &CommandContext<'_>, args: &[String]) -> Result<Flow, CommandError> {
    ctx.console
        .line(&format!("Old session id: {}", ctx.session.session_id()));
    let sid = ctx.arg_or_prompt(args, 0, "sid", "New session id: ").await?;
    let sid = parse_number("sid", &sid)?;

    ctx.session.set_session_id(sid);
    ctx.session
        .send(SendRequest::new(MessageType::JoinSession))
        .await?;
    Ok(Flow::Continue)
}

async fn increment(ctx: &CommandContext<'_>, args: &[String]) -> Result<Flow, CommandError> {
    let (user, amount) = match args {
        [user, amount] => (user.clone(), amount.clone()),
        _ => (
            ctx.prompt("user", "username: ").await?,
            ctx.prompt("increment", "increment: ").await?,
        ),
    };
    let amount = parse_number("increment", &amount)?;

    // The increment travels in the session field.
    request_and_wait(
        ctx,
        SendRequest::new(MessageType::IncrementScore)
            .username(user)
            .session(amount),
    )
    .await
}

async fn multi_line(ctx: &CommandContext<'_>) -> Result<Flow, CommandError> {
    ctx.console.line(&format!("Type {ML_FINISH} to finish it."));

    let mut lines = Vec::new();
    while let Some(line) = ctx.input.next_line(">>> ").await.map_err(CommandError::Input)? {
        if line == ML_FINISH {
            break;
        }
        lines.push(line);
    }

    for line in lines {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        let name = format!("{COMMAND_PREFIX}{first}");
        let args: Vec<String> = tokens.map(str::to_owned).collect();

        // An unknown line stops the batch; the lines after it don't run.
        let command = ctx
            .commands
            .find(&name)
            .ok_or(CommandError::Unknown(name))?;
        if command.run(ctx, &args).await? == Flow::Exit {
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

async fn relay(ctx: &CommandContext<'_>, args: &[String]) -> Result<Flow, CommandError> {
    let Some((visible, words)) = args.split_first() else {
        return Err(CommandError::MissingArgument("visible name"));
    };
    // `-` stands for "no override": receivers see the real name.
    let visible = if visible == "-" { "" } else { visible.as_str() };
    let message = words.join(" ");

    ctx.session.send_relay(visible, &message).await?;
    display::show_message(
        ctx.console,
        ctx.session.session_id(),
        &ctx.session.username(),
        &message,
        MessageFlags::RELAY,
    );
    Ok(Flow::Continue)
}

async fn join(ctx: &CommandContext<'_>, args: &[String]) -> Result<Flow, CommandError> {
    let name = ctx.arg_or_prompt(args, 0, "name", "session name: ").await?;
    let Some(id) = resolve_session(ctx, &name).await? else {
        ctx.console.line("No such session");
        return Ok(Flow::Continue);
    };

    ctx.session.set_session_id(id);
    ctx.session
        .send(SendRequest::new(MessageType::JoinSession))
        .await?;
    Ok(Flow::Continue)
}

async fn quit_session(ctx: &CommandContext<'_>, args: &[String]) -> Result<Flow, CommandError> {
    let sid = ctx.arg_or_prompt(args, 0, "sid", "sid: ").await?;
    let sid = parse_number("sid", &sid)?;

    if ctx.session.session_id() == sid {
        ctx.session.set_session_id(0);
    }
    ctx.session
        .send(SendRequest::new(MessageType::QuitSession).session(sid))
        .await?;
    Ok(Flow::Continue)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sends `request` and blocks until the receive loop has handled a reply.
async fn request_and_wait(
    ctx: &CommandContext<'_>,
    request: SendRequest,
) -> Result<Flow, CommandError> {
    ctx.session.send(request).await?;
    wait(ctx).await;
    Ok(Flow::Continue)
}

async fn wait(ctx: &CommandContext<'_>) {
    if ctx.session.wait_until_reply().await == WaitOutcome::Cancelled {
        tracing::debug!("reply wait cancelled");
    }
}

/// Turns a session name into its id, refreshing the cached list once if
/// the name isn't in it.
async fn resolve_session(
    ctx: &CommandContext<'_>,
    name: &str,
) -> Result<Option<i32>, CommandError> {
    if let Some(id) = ctx.session.session_id_by_name(name) {
        return Ok(Some(id));
    }

    ctx.session
        .send(SendRequest::new(MessageType::ListSessions))
        .await?;
    wait(ctx).await;
    Ok(ctx.session.session_id_by_name(name))
}
