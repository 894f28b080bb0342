pub mod cooldown;
pub mod dispatcher;
pub mod handlers;
pub mod registry;

pub use cooldown::{create_shared_cooldown_store, CooldownStore, SharedCooldownStore};
pub use dispatcher::{Command, CommandRegistry, DispatchOutcome, Dispatcher};
pub use registry::{handler, register_later, HandlerFn, HandlerRegistry};

use std::sync::Arc;

use crate::bot::BotContext;
use crate::error::{BotError, Result};
use crate::models::InboundMessage;

/// Everything a handler gets for one invocation
#[derive(Clone)]
pub struct Invocation {
    pub ctx: Arc<BotContext>,
    pub message: InboundMessage,
    /// The command or subcommand that was resolved
    pub command: Arc<Command>,
    /// Tokens after the command (and subcommand) name
    pub args: Vec<String>,
    pub commands: Arc<CommandRegistry>,
}

impl Invocation {
    /// Reply in the channel the command came from
    pub async fn reply(&self, text: impl AsRef<str>) -> Result<()> {
        self.ctx
            .messenger
            .send(&self.message.channel_id, text.as_ref())
            .await
    }

    pub async fn reply_usage(&self) -> Result<()> {
        self.reply(format!("Usage: {}", self.command.usage)).await
    }

    pub fn is_admin(&self) -> bool {
        self.ctx.is_admin(&self.message.roles)
    }

    /// Fails with `PermissionDenied` unless the author holds the admin role
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(BotError::PermissionDenied {
                message: format!(
                    "{} may not run '{}'",
                    self.message.author_name, self.command.path
                ),
            })
        }
    }

    /// Command prefix, for usage hints
    pub fn prefix(&self) -> &str {
        &self.commands.prefix
    }
}
