use tracing::{error, info};

use super::{is_valid_player_id, subcommand_help};
use crate::commands::registry::{handler, HandlerRegistry};
use crate::commands::Invocation;
use crate::error::{BotError, Result};
use crate::messages;

pub fn register(registry: &mut HandlerRegistry) {
    registry.register("handleIDCommand", handler(handle_id));
    registry.register("handleIDAddCommand", handler(handle_id_add));
    registry.register("handleIDEditCommand", handler(handle_id_edit));
    registry.register("handleIDRemoveCommand", handler(handle_id_remove));
    registry.register("handleIDListCommand", handler(handle_id_list));
}

async fn handle_id(inv: Invocation) -> Result<()> {
    match inv.ctx.store.get_player(&inv.message.author_id).await? {
        Some(player) if inv.args.is_empty() => {
            inv.reply(format!(
                "Your Player ID is {}.\n\n{}",
                player.player_id,
                subcommand_help(&inv.command)
            ))
            .await
        }
        _ => inv.reply(subcommand_help(&inv.command)).await,
    }
}

async fn handle_id_add(inv: Invocation) -> Result<()> {
    let Some(player_id) = inv.args.first() else {
        return inv.reply_usage().await;
    };
    if !is_valid_player_id(player_id) {
        return inv.reply(messages::invalid_player_id_message()).await;
    }

    if let Some(existing) = inv.ctx.store.get_player(&inv.message.author_id).await? {
        return inv
            .reply(format!(
                "You already have Player ID {} associated. Use `{}id edit <PlayerID>` to change it.",
                existing.player_id,
                inv.prefix()
            ))
            .await;
    }

    inv.ctx
        .store
        .upsert_player(&inv.message.author_id, player_id)
        .await?;
    info!(
        "Player ID {} added for {} ({})",
        player_id, inv.message.author_name, inv.message.author_id
    );

    inv.reply(format!(
        "Player ID {} has been added for user {}.",
        player_id, inv.message.author_name
    ))
    .await
}

async fn handle_id_edit(inv: Invocation) -> Result<()> {
    let Some(player_id) = inv.args.first() else {
        return inv.reply_usage().await;
    };
    if !is_valid_player_id(player_id) {
        return inv.reply(messages::invalid_player_id_message()).await;
    }

    if inv.ctx.store.get_player(&inv.message.author_id).await?.is_none() {
        return inv
            .reply(messages::missing_player_id_message(inv.prefix()))
            .await;
    }

    inv.ctx
        .store
        .upsert_player(&inv.message.author_id, player_id)
        .await?;
    inv.reply(format!("Your Player ID has been updated to {}.", player_id))
        .await
}

async fn handle_id_remove(inv: Invocation) -> Result<()> {
    match inv.ctx.store.remove_player(&inv.message.author_id).await {
        Ok(()) => inv.reply("Your Player ID association has been removed.").await,
        Err(BotError::NotFound { .. }) => {
            inv.reply(messages::missing_player_id_message(inv.prefix()))
                .await
        }
        Err(e) => {
            error!("Failed to remove player for {}: {}", inv.message.author_id, e);
            Err(e)
        }
    }
}

async fn handle_id_list(inv: Invocation) -> Result<()> {
    let players = inv.ctx.store.list_players().await?;
    if players.is_empty() {
        return inv.reply("No Player IDs have been registered.").await;
    }

    let mut message = String::from("Player ID List:\n");
    for player in players {
        message.push_str(&format!("<@{}>: {}\n", player.discord_id, player.player_id));
    }
    inv.reply(message).await
}
