use std::sync::Arc;
use tracing::{error, info};

use crate::commands::handlers::{self, welcome};
use crate::commands::{
    create_shared_cooldown_store, CommandRegistry, DispatchOutcome, Dispatcher, HandlerRegistry,
};
use crate::config::{CommandsConfig, Settings};
use crate::error::Result;
use crate::giftcode::{Deployer, GiftCodeClient};
use crate::messaging::SharedMessenger;
use crate::models::InboundMessage;
use crate::scrape::Scraper;
use crate::state::{create_shared_greeting_tracker, SharedGreetingTracker, SharedStore};

/// Services shared by every handler
pub struct BotContext {
    pub settings: Settings,
    pub store: SharedStore,
    pub messenger: SharedMessenger,
    pub giftcodes: Arc<GiftCodeClient>,
    pub scraper: Arc<Scraper>,
    pub greetings: SharedGreetingTracker,
}

impl BotContext {
    pub fn new(settings: Settings, store: SharedStore, messenger: SharedMessenger) -> Result<Self> {
        let giftcodes = Arc::new(GiftCodeClient::from_settings(&settings.gift_code)?);
        let scraper = Arc::new(Scraper::from_settings(&settings, messenger.clone())?);

        Ok(Self {
            settings,
            store,
            messenger,
            giftcodes,
            scraper,
            greetings: create_shared_greeting_tracker(),
        })
    }

    /// Holders of the configured admin role. With no role configured nobody is admin.
    pub fn is_admin(&self, roles: &[String]) -> bool {
        let admin_role = &self.settings.discord.admin_role_id;
        !admin_role.is_empty() && roles.iter().any(|r| r == admin_role)
    }

    pub fn deployer(&self) -> Deployer {
        Deployer::new(
            self.giftcodes.clone(),
            self.store.clone(),
            self.settings.gift_code.deploy_concurrency,
        )
    }
}

/// One running bot: its context plus the dispatcher built for it
pub struct Bot {
    ctx: Arc<BotContext>,
    dispatcher: Dispatcher,
}

impl Bot {
    /// Collect handlers, bind the command tree and build the dispatcher.
    /// Handlers staged with `register_later` are adopted here and cleared.
    pub fn new(ctx: BotContext, commands: &CommandsConfig) -> Result<Self> {
        let mut registry = HandlerRegistry::new();
        handlers::register_all(&mut registry);
        let adopted = registry.adopt_pending();
        info!(
            "{} handlers registered ({} adopted from pending)",
            registry.len(),
            adopted
        );

        let commands = Arc::new(CommandRegistry::load(commands, &registry)?);
        let ctx = Arc::new(ctx);
        let dispatcher = Dispatcher::new(ctx.clone(), commands, create_shared_cooldown_store());

        Ok(Self { ctx, dispatcher })
    }

    pub fn ctx(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Entry point for every inbound message. A DM from someone we greeted
    /// that is not a command is taken as their player ID.
    pub async fn handle_message(&self, message: InboundMessage) -> DispatchOutcome {
        let prefix = self.dispatcher.commands().prefix.as_str();
        if message.is_direct()
            && !message.content.starts_with(prefix)
            && self.ctx.greetings.is_pending(&message.author_id)
        {
            if let Err(e) = welcome::handle_greeting_reply(&self.ctx, &message).await {
                error!(
                    "Failed to handle greeting reply from {}: {}",
                    message.author_id, e
                );
            }
            return DispatchOutcome::Handled;
        }

        self.dispatcher.dispatch(message).await
    }

    /// Greet a new member by DM and wait for their player ID
    pub async fn greet_member(&self, user_id: &str) -> Result<()> {
        self.ctx.greetings.cleanup_stale();
        welcome::send_welcome(&self.ctx, user_id).await
    }
}
