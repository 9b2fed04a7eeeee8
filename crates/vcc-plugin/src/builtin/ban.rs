//! `ban`: mute users locally.
//!
//! The server still delivers their messages; this plugin just drops them
//! before they are shown. The list lives in the plugin instance and is
//! gone when the client exits.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use vcc_protocol::Request;

use crate::{Command, CommandContext, CommandError, Console, Flow, Plugin};

type BanList = Arc<Mutex<HashSet<String>>>;

/// Drops incoming requests from banned usernames, and adds `-ban` and
/// `-unban`.
#[derive(Debug, Default)]
pub struct BanPlugin {
    banned: BanList,
}

impl BanPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_banned(&self, username: &str) -> bool {
        lock(&self.banned).contains(username)
    }
}

impl Plugin for BanPlugin {
    fn name(&self) -> &str {
        "ban"
    }

    fn on_receive(&self, request: Request, _console: &dyn Console) -> Option<Request> {
        if self.is_banned(&request.username) {
            tracing::trace!(username = %request.username, "dropped banned message");
            return None;
        }
        Some(request)
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![
            Arc::new(Ban {
                banned: Arc::clone(&self.banned),
            }),
            Arc::new(Unban {
                banned: Arc::clone(&self.banned),
            }),
        ]
    }
}

struct Ban {
    banned: BanList,
}

#[async_trait]
impl Command for Ban {
    fn name(&self) -> &str {
        "-ban"
    }

    fn help(&self) -> &str {
        "Ban someone so you won't receive messages from them"
    }

    async fn run(
        &self,
        ctx: &CommandContext<'_>,
        args: &[String],
    ) -> Result<Flow, CommandError> {
        let user = ctx
            .arg_or_prompt(args, 0, "user", "Enter the people you would like to ban: ")
            .await?;
        lock(&self.banned).insert(user);
        Ok(Flow::Continue)
    }
}

struct Unban {
    banned: BanList,
}

#[async_trait]
impl Command for Unban {
    fn name(&self) -> &str {
        "-unban"
    }

    fn help(&self) -> &str {
        "Unban someone so you receive their messages again"
    }

    async fn run(
        &self,
        ctx: &CommandContext<'_>,
        args: &[String],
    ) -> Result<Flow, CommandError> {
        let user = ctx
            .arg_or_prompt(args, 0, "user", "Enter the people you would like to unban: ")
            .await?;
        lock(&self.banned).remove(&user);
        Ok(Flow::Continue)
    }
}

fn lock(list: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}
