use tracing::{error, info};

use super::subcommand_help;
use crate::commands::registry::{handler, HandlerRegistry};
use crate::commands::Invocation;
use crate::error::{BotError, Result};
use crate::giftcode::redeem_and_record;
use crate::messages;

const ITEMS_PER_PAGE: usize = 10;

pub fn register(registry: &mut HandlerRegistry) {
    registry.register("handleGiftCodeCommand", handler(handle_giftcode));
    registry.register("handleGiftCodeRedeemCommand", handler(handle_redeem));
    registry.register("handleGiftCodeDeployCommand", handler(handle_deploy));
    registry.register("handleGiftCodeValidateCommand", handler(handle_validate));
    registry.register("handleGiftCodeListCommand", handler(handle_list));
}

async fn handle_giftcode(inv: Invocation) -> Result<()> {
    inv.reply(subcommand_help(&inv.command)).await
}

fn has_valid_length(inv: &Invocation, code: &str) -> bool {
    let settings = &inv.ctx.settings.gift_code;
    (settings.min_length..=settings.max_length).contains(&code.chars().count())
}

async fn length_error(inv: &Invocation) -> Result<()> {
    let settings = &inv.ctx.settings.gift_code;
    inv.reply(format!(
        "❌ Invalid gift code. It should be between {} and {} characters.",
        settings.min_length, settings.max_length
    ))
    .await
}

async fn handle_redeem(inv: Invocation) -> Result<()> {
    let Some(code) = inv.args.first() else {
        return inv.reply_usage().await;
    };
    if !has_valid_length(&inv, code) {
        return length_error(&inv).await;
    }

    let Some(player) = inv.ctx.store.get_player(&inv.message.author_id).await? else {
        return inv
            .reply(messages::missing_player_id_message(inv.prefix()))
            .await;
    };

    let outcome = redeem_and_record(
        &inv.ctx.giftcodes,
        &inv.ctx.store,
        &inv.message.author_id,
        &player.player_id,
        code,
    )
    .await;

    let text = match &outcome.record_error {
        Some(e) if outcome.redeemed_but_unrecorded() => {
            format!("⚠️ Gift code redeemed but failed to record: {}", e)
        }
        _ => outcome.result.message(),
    };
    inv.reply(text).await
}

async fn handle_deploy(inv: Invocation) -> Result<()> {
    inv.require_admin()?;
    let Some(code) = inv.args.first().cloned() else {
        return inv.reply_usage().await;
    };
    if !has_valid_length(&inv, &code) {
        return length_error(&inv).await;
    }

    inv.reply("🚀 Deploying gift code to all users...").await?;
    info!(
        "Gift code {} deployment started by {}",
        code, inv.message.author_name
    );

    let ctx = inv.ctx.clone();
    let channel_id = inv.message.channel_id.clone();
    tokio::spawn(async move {
        let deployer = ctx.deployer();
        if let Err(e) = deployer
            .deploy_to_all(&code, ctx.messenger.as_ref(), &channel_id)
            .await
        {
            error!("Gift code {} deployment failed: {}", code, e);
            if let Err(e) = ctx
                .messenger
                .send(&channel_id, &format!("❌ Gift code deployment failed: {}", e))
                .await
            {
                error!("Failed to report gift code {} deployment failure: {}", code, e);
            }
        }
    });

    Ok(())
}

async fn handle_validate(inv: Invocation) -> Result<()> {
    let Some(code) = inv.args.first() else {
        return inv.reply_usage().await;
    };
    if !has_valid_length(&inv, code) {
        return length_error(&inv).await;
    }

    let Some(player) = inv.ctx.store.get_player(&inv.message.author_id).await? else {
        return inv
            .reply(messages::missing_player_id_message(inv.prefix()))
            .await;
    };

    match inv.ctx.giftcodes.validate_player(&player.player_id).await {
        Ok(profile) => {
            let who = profile
                .nickname
                .map(|n| format!("{} ({})", n, player.player_id))
                .unwrap_or(player.player_id);
            inv.reply(format!(
                "✅ Gift code `{}` looks valid and Player {} can redeem it.",
                code, who
            ))
            .await
        }
        Err(BotError::PlayerValidation { message, .. }) => {
            inv.reply(format!("❌ Invalid Player ID: {}", message)).await
        }
        Err(e) => {
            error!("Failed to validate player {}: {}", player.player_id, e);
            inv.reply("❌ Could not reach the gift code service. Please try again later.")
                .await
        }
    }
}

async fn handle_list(inv: Invocation) -> Result<()> {
    let page = inv
        .args
        .first()
        .and_then(|p| p.parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let offset = (page - 1).saturating_mul(ITEMS_PER_PAGE);

    let is_admin = inv.is_admin();
    let filter = if is_admin {
        None
    } else {
        Some(inv.message.author_id.as_str())
    };
    let redemptions = inv
        .ctx
        .store
        .list_redemptions(filter, offset, ITEMS_PER_PAGE)
        .await?;

    if redemptions.is_empty() {
        return inv.reply("No gift codes found for this page.").await;
    }

    let mut message = format!("📜 Gift code redemptions (Page {}):\n", page);
    for r in &redemptions {
        let when = r.redeemed_at.format("%Y-%m-%d %H:%M");
        if is_admin {
            message.push_str(&format!(
                "{} | Discord: <@{}>, Player ID: {}, Code: {}, Status: {}\n",
                when, r.discord_id, r.player_id, r.gift_code, r.status
            ));
        } else {
            message.push_str(&format!(
                "{} | Code: {}, Status: {}\n",
                when, r.gift_code, r.status
            ));
        }
    }
    message.push_str(&format!(
        "\nUse `{}giftcode list {}` to see the next page",
        inv.prefix(),
        page.saturating_add(1)
    ));

    inv.reply(message).await
}
