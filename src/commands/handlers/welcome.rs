use tracing::{error, info};

use super::is_valid_player_id;
use crate::bot::BotContext;
use crate::commands::registry::{handler, HandlerRegistry};
use crate::commands::Invocation;
use crate::error::Result;
use crate::messages;
use crate::models::InboundMessage;

pub fn register(registry: &mut HandlerRegistry) {
    registry.register("handleWelcomeCommand", handler(handle_welcome));
}

/// Accepts `<@123>`, `<@!123>` or a bare `123`
pub fn parse_user_target(target: &str) -> Option<&str> {
    let target = target.trim();
    let id = match target.strip_prefix("<@").and_then(|t| t.strip_suffix('>')) {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => target,
    };
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}

/// DM the welcome text and wait for the user's player ID
pub async fn send_welcome(ctx: &BotContext, user_id: &str) -> Result<()> {
    let text = messages::welcome_message(&format!("<@{}>", user_id));
    let dm_channel = ctx.messenger.send_direct(user_id, &text).await?;
    ctx.greetings.start(user_id, &dm_channel);
    info!("Sent welcome message to user {}", user_id);
    Ok(())
}

/// Treat a DM from a greeted user as their player ID
pub async fn handle_greeting_reply(ctx: &BotContext, message: &InboundMessage) -> Result<()> {
    let player_id = message.content.trim();
    if !is_valid_player_id(player_id) {
        return ctx
            .messenger
            .send(&message.channel_id, &messages::invalid_player_id_message())
            .await;
    }

    if let Err(e) = ctx.store.upsert_player(&message.author_id, player_id).await {
        error!(
            "Failed to add Player ID {} for {}: {}",
            player_id, message.author_id, e
        );
        return ctx
            .messenger
            .send(&message.channel_id, &messages::greeting_failure_message())
            .await;
    }

    ctx.greetings.finish(&message.author_id);
    info!(
        "Player ID {} associated with new member {}",
        player_id, message.author_id
    );
    ctx.messenger
        .send(
            &message.channel_id,
            &messages::greeting_success_message(player_id),
        )
        .await
}

async fn handle_welcome(inv: Invocation) -> Result<()> {
    inv.require_admin()?;
    let Some(target) = inv.args.first() else {
        return inv
            .reply("⚠️ Please provide a Discord ID or @mention to send the welcome message.")
            .await;
    };
    let Some(user_id) = parse_user_target(target) else {
        return inv.reply(format!("⚠️ '{}' is not a user mention or ID.", target)).await;
    };

    send_welcome(&inv.ctx, user_id).await?;
    inv.reply(format!("✅ Welcome message sent to <@{}>.", user_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{admin_message, message, test_bot};

    #[test]
    fn test_parse_user_target() {
        assert_eq!(parse_user_target("<@123>"), Some("123"));
        assert_eq!(parse_user_target("<@!456>"), Some("456"));
        assert_eq!(parse_user_target(" 789 "), Some("789"));
        assert_eq!(parse_user_target("<@&12>"), None);
        assert_eq!(parse_user_target("bob"), None);
    }

    #[tokio::test]
    async fn test_admin_welcome_starts_greeting() {
        let (bot, messenger) = test_bot();

        bot.handle_message(admin_message("a1", "!welcome <@!555>")).await;

        assert!(bot.ctx().greetings.is_pending("555"));
        let sent = messenger.sent();
        assert_eq!(sent[0].0, "dm-555");
        assert!(sent[0].1.contains("<@555>"));
        assert!(sent[1].1.contains("Welcome message sent"));
    }

    #[tokio::test]
    async fn test_welcome_requires_admin() {
        let (bot, messenger) = test_bot();
        bot.handle_message(message("u1", "!welcome 555")).await;
        assert!(!bot.ctx().greetings.is_pending("555"));
        assert!(messenger.last().contains("do not have permission"));
    }
}
