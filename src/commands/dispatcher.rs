use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::cooldown::SharedCooldownStore;
use super::registry::{HandlerFn, HandlerRegistry};
use super::Invocation;
use crate::bot::BotContext;
use crate::config::{parse_cooldown, CommandSpec, CommandsConfig};
use crate::error::{BotError, Result};
use crate::messages;
use crate::models::InboundMessage;

/// A loaded command with its handler bound
pub struct Command {
    pub name: String,
    /// `name` or `parent.name`
    pub path: String,
    pub description: String,
    pub usage: String,
    pub cooldown: Option<Duration>,
    /// Cooldown as written in the config, for help output
    pub cooldown_spec: String,
    pub hidden: bool,
    pub handler_name: String,
    pub subcommands: BTreeMap<String, Arc<Command>>,
    handler: Option<HandlerFn>,
}

impl Command {
    pub fn handler(&self) -> Option<&HandlerFn> {
        self.handler.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }

    /// Subcommands that show up in help listings
    pub fn visible_subcommands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.subcommands.values().filter(|c| !c.hidden)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("path", &self.path)
            .field("cooldown", &self.cooldown)
            .field("hidden", &self.hidden)
            .field("handler_name", &self.handler_name)
            .field("bound", &self.is_bound())
            .field("subcommands", &self.subcommands.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Command tree, read-only once loaded. Names are stored lowercased.
#[derive(Debug)]
pub struct CommandRegistry {
    pub prefix: String,
    commands: BTreeMap<String, Arc<Command>>,
}

impl CommandRegistry {
    /// Bind every command to its handler. Unknown handler names are logged and
    /// left unbound; such commands answer "not implemented yet".
    pub fn load(config: &CommandsConfig, handlers: &HandlerRegistry) -> Result<Self> {
        Self::build(config, handlers, false)
    }

    /// Like [`CommandRegistry::load`] but any unbound command is an error
    pub fn load_strict(config: &CommandsConfig, handlers: &HandlerRegistry) -> Result<Self> {
        Self::build(config, handlers, true)
    }

    fn build(config: &CommandsConfig, handlers: &HandlerRegistry, strict: bool) -> Result<Self> {
        config.validate()?;

        let mut commands = BTreeMap::new();
        for (name, spec) in &config.commands {
            let name = name.trim().to_lowercase();

            let mut subcommands = BTreeMap::new();
            for (sub_name, sub_spec) in &spec.subcommands {
                let sub_name = sub_name.trim().to_lowercase();
                let path = format!("{}.{}", name, sub_name);
                let sub = build_command(&sub_name, &path, sub_spec, BTreeMap::new(), handlers, strict)?;
                subcommands.insert(sub_name, Arc::new(sub));
            }

            let command = build_command(&name, &name, spec, subcommands, handlers, strict)?;
            commands.insert(name, Arc::new(command));
        }

        info!("Loaded {} commands from config", commands.len());
        Ok(Self {
            prefix: config.prefix.clone(),
            commands,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Command>> {
        self.commands.get(&name.to_lowercase())
    }

    /// Top-level commands that show up in help listings, by name
    pub fn visible(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.values().filter(|c| !c.hidden)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn build_command(
    name: &str,
    path: &str,
    spec: &CommandSpec,
    subcommands: BTreeMap<String, Arc<Command>>,
    handlers: &HandlerRegistry,
    strict: bool,
) -> Result<Command> {
    let handler = handlers.get(&spec.handler);
    match &handler {
        Some(_) => debug!("Handler '{}' associated with command '{}'", spec.handler, path),
        None if strict => {
            return Err(BotError::UnresolvedHandler {
                path: path.to_string(),
                handler: spec.handler.clone(),
            })
        }
        None => warn!("Handler '{}' not found for command '{}'", spec.handler, path),
    }

    Ok(Command {
        name: name.to_string(),
        path: path.to_string(),
        description: spec.description.clone(),
        usage: spec.usage.clone(),
        cooldown: parse_cooldown(&spec.cooldown)?,
        cooldown_spec: spec.cooldown.clone(),
        hidden: spec.hidden,
        handler_name: spec.handler.clone(),
        subcommands,
        handler,
    })
}

/// What the dispatcher did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command
    Ignored,
    UnknownCommand,
    CoolingDown(Duration),
    NotImplemented,
    Handled,
    /// The handler returned an error
    Failed(String),
}

/// Routes prefixed messages to command handlers, enforcing cooldowns
pub struct Dispatcher {
    ctx: Arc<BotContext>,
    commands: Arc<CommandRegistry>,
    cooldowns: SharedCooldownStore,
}

impl Dispatcher {
    pub fn new(
        ctx: Arc<BotContext>,
        commands: Arc<CommandRegistry>,
        cooldowns: SharedCooldownStore,
    ) -> Self {
        Self {
            ctx,
            commands,
            cooldowns,
        }
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    pub fn cooldowns(&self) -> &SharedCooldownStore {
        &self.cooldowns
    }

    async fn reply(&self, message: &InboundMessage, text: &str) {
        if let Err(e) = self.ctx.messenger.send(&message.channel_id, text).await {
            error!("Failed to reply in channel {}: {}", message.channel_id, e);
        }
    }

    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        let Some(content) = message.content.strip_prefix(self.commands.prefix.as_str()) else {
            return DispatchOutcome::Ignored;
        };

        let mut tokens = content.split_whitespace();
        let Some(name) = tokens.next() else {
            return DispatchOutcome::Ignored;
        };
        let name = name.to_lowercase();
        let mut args: Vec<String> = tokens.map(str::to_string).collect();

        let Some(command) = self.commands.get(&name).cloned() else {
            debug!("Unknown command '{}' from {}", name, message.author_name);
            self.reply(
                &message,
                &messages::unknown_command_message(&self.commands.prefix),
            )
            .await;
            return DispatchOutcome::UnknownCommand;
        };

        let sub = args
            .first()
            .and_then(|token| command.subcommands.get(&token.to_lowercase()))
            .cloned();
        let command = match sub {
            Some(sub) => {
                args.remove(0);
                sub
            }
            None => command,
        };

        if let Some(remaining) = self.cooldowns.remaining(&message.author_id, &command.path) {
            debug!(
                "Cooldown active for {} on '{}' ({:?} left)",
                message.author_id, command.path, remaining
            );
            self.reply(&message, &cooldown_notice(&self.commands.prefix, &command, remaining))
                .await;
            return DispatchOutcome::CoolingDown(remaining);
        }

        let Some(handler) = command.handler().cloned() else {
            self.reply(
                &message,
                &messages::not_implemented_message(&command.path.replace('.', " ")),
            )
            .await;
            return DispatchOutcome::NotImplemented;
        };

        // Claim the window before running so concurrent invocations cannot both pass
        if let Err(remaining) =
            self.cooldowns
                .try_acquire(&message.author_id, &command.path, command.cooldown)
        {
            self.reply(&message, &cooldown_notice(&self.commands.prefix, &command, remaining))
                .await;
            return DispatchOutcome::CoolingDown(remaining);
        }

        info!(
            "Command '{}' invoked by {} (ID: {}) in {}",
            command.path,
            message.author_name,
            message.author_id,
            message.guild_id.as_deref().unwrap_or("DM")
        );

        let author_id = message.author_id.clone();
        let channel_id = message.channel_id.clone();
        let path = command.path.clone();
        let cooldown = command.cooldown;

        let invocation = Invocation {
            ctx: self.ctx.clone(),
            message,
            command,
            args,
            commands: self.commands.clone(),
        };

        let result = handler(invocation).await;

        // The window runs from the end of the invocation. A refused caller leaves no trace.
        if matches!(result, Err(BotError::PermissionDenied { .. })) {
            self.cooldowns.reset(&author_id, &path);
        } else {
            self.cooldowns.set(&author_id, &path, cooldown);
        }

        match result {
            Ok(()) => DispatchOutcome::Handled,
            Err(e) => {
                let text = match &e {
                    BotError::PermissionDenied { .. } => {
                        warn!("{}", e);
                        messages::permission_denied_message()
                    }
                    _ => {
                        error!("Error in command '{}': {}", path, e);
                        format!("❌ An error occurred while running `{}`.", path.replace('.', " "))
                    }
                };
                if let Err(send_err) = self.ctx.messenger.send(&channel_id, &text).await {
                    error!("Failed to reply in channel {}: {}", channel_id, send_err);
                }
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

fn cooldown_notice(prefix: &str, command: &Command, remaining: Duration) -> String {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    format!(
        "⏳ Please wait {}s before using `{}{}` again.",
        secs,
        prefix,
        command.path.replace('.', " ")
    )
}
