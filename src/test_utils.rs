//! Fakes and builders shared by unit tests.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;

use crate::bot::{Bot, BotContext};
use crate::config::{CommandsConfig, Settings};
use crate::error::{BotError, Result};
use crate::logging::{create_log_tail, SharedLogTail, TailLayer};
use crate::messaging::Messenger;
use crate::models::{GiftCodeRedemption, InboundMessage, NewRedemption, Player, Term};
use crate::state::{JsonStore, Store};

/// Held by tests that stage handlers or build bots, since both touch the
/// process-wide pending set
pub static PENDING_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Messenger that remembers what it was asked to send
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// (channel ID, text) pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> String {
        self.sent
            .lock()
            .last()
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BotError::Discord {
                message: "send failed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        self.check()?;
        self.sent
            .lock()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> Result<String> {
        self.check()?;
        let channel = format!("dm-{}", user_id);
        self.sent.lock().push((channel.clone(), text.to_string()));
        Ok(channel)
    }
}

/// In-memory store whose audit log refuses every write
pub struct FailingRecordStore {
    inner: JsonStore,
}

impl FailingRecordStore {
    pub fn new() -> Self {
        Self {
            inner: JsonStore::in_memory(),
        }
    }
}

#[async_trait]
impl Store for FailingRecordStore {
    async fn upsert_player(&self, discord_id: &str, player_id: &str) -> Result<()> {
        self.inner.upsert_player(discord_id, player_id).await
    }

    async fn get_player(&self, discord_id: &str) -> Result<Option<Player>> {
        self.inner.get_player(discord_id).await
    }

    async fn remove_player(&self, discord_id: &str) -> Result<()> {
        self.inner.remove_player(discord_id).await
    }

    async fn list_players(&self) -> Result<Vec<Player>> {
        self.inner.list_players().await
    }

    async fn player_map(&self) -> Result<HashMap<String, String>> {
        self.inner.player_map().await
    }

    async fn add_term(&self, term: &str, description: &str) -> Result<()> {
        self.inner.add_term(term, description).await
    }

    async fn edit_term(&self, term: &str, description: &str) -> Result<()> {
        self.inner.edit_term(term, description).await
    }

    async fn remove_term(&self, term: &str) -> Result<()> {
        self.inner.remove_term(term).await
    }

    async fn get_term(&self, term: &str) -> Result<Option<Term>> {
        self.inner.get_term(term).await
    }

    async fn list_terms(&self) -> Result<Vec<Term>> {
        self.inner.list_terms().await
    }

    async fn record_redemption(&self, _row: NewRedemption) -> Result<GiftCodeRedemption> {
        Err(BotError::StateSave {
            path: "audit".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    async fn list_redemptions(
        &self,
        discord_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<GiftCodeRedemption>> {
        self.inner.list_redemptions(discord_id, offset, limit).await
    }
}

/// Guild message in channel "chan"
pub fn message(author_id: &str, content: &str) -> InboundMessage {
    InboundMessage {
        author_id: author_id.to_string(),
        author_name: author_id.to_string(),
        channel_id: "chan".to_string(),
        guild_id: Some("guild".to_string()),
        content: content.to_string(),
        roles: vec![],
    }
}

/// Guild message from a holder of the "admin" role
pub fn admin_message(author_id: &str, content: &str) -> InboundMessage {
    InboundMessage {
        roles: vec!["admin".to_string()],
        ..message(author_id, content)
    }
}

/// DM in channel "dm-<author>"
pub fn direct_message(author_id: &str, content: &str) -> InboundMessage {
    InboundMessage {
        channel_id: format!("dm-{}", author_id),
        guild_id: None,
        ..message(author_id, content)
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.discord.admin_role_id = "admin".to_string();
    settings.gift_code.salt = "s3cret".to_string();
    settings.gift_code.api_timeout_secs = 5;
    settings
}

pub fn test_context() -> (Arc<BotContext>, Arc<RecordingMessenger>) {
    let messenger = Arc::new(RecordingMessenger::new());
    let ctx = BotContext::new(
        test_settings(),
        Arc::new(JsonStore::in_memory()),
        messenger.clone(),
    )
    .unwrap();
    (Arc::new(ctx), messenger)
}

/// The shipped command tree, without cooldowns
pub fn test_commands() -> CommandsConfig {
    let mut config =
        CommandsConfig::from_json(include_str!("../configs/commands.json")).unwrap();
    for command in config.commands.values_mut() {
        command.cooldown.clear();
        for sub in command.subcommands.values_mut() {
            sub.cooldown.clear();
        }
    }
    config
}

pub fn test_bot() -> (Bot, Arc<RecordingMessenger>) {
    test_bot_with(|_| {})
}

pub fn test_bot_with(configure: impl FnOnce(&mut Settings)) -> (Bot, Arc<RecordingMessenger>) {
    let mut settings = test_settings();
    configure(&mut settings);

    let messenger = Arc::new(RecordingMessenger::new());
    let ctx = BotContext::new(
        settings,
        Arc::new(JsonStore::in_memory()),
        messenger.clone(),
    )
    .unwrap();

    let _guard = PENDING_LOCK.lock();
    let bot = Bot::new(ctx, &test_commands()).unwrap();
    (bot, messenger)
}

/// Poll until `condition` holds, failing the test after two seconds
pub async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

/// Capture events on this thread until the guard drops
pub fn capture_logs() -> (SharedLogTail, DefaultGuard) {
    let tail = create_log_tail(200);
    let subscriber = tracing_subscriber::registry().with(TailLayer::new(tail.clone()));
    (tail, tracing::subscriber::set_default(subscriber))
}

/// True when any captured line contains `needle`
pub fn logged(tail: &SharedLogTail, needle: &str) -> bool {
    tail.recent(200).iter().any(|line| line.contains(needle))
}
