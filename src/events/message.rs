use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

use super::{Data, Error};
use crate::commands::DispatchOutcome;
use crate::models::InboundMessage;

/// Translate a gateway message and hand it to the bot
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    if msg.author.bot {
        return Ok(());
    }

    let roles = author_roles(ctx, msg).await;
    let inbound = to_inbound(msg, roles);

    match data.bot.handle_message(inbound).await {
        DispatchOutcome::Failed(reason) => {
            warn!("Command from {} failed: {}", msg.author.name, reason);
        }
        DispatchOutcome::Ignored => {}
        outcome => debug!("Message from {} -> {:?}", msg.author.name, outcome),
    }

    Ok(())
}

/// Role IDs from the message's member data, falling back to a member fetch
async fn author_roles(ctx: &serenity::Context, msg: &serenity::Message) -> Vec<String> {
    let Some(guild_id) = msg.guild_id else {
        return Vec::new();
    };

    if let Some(member) = &msg.member {
        return member.roles.iter().map(|r| r.to_string()).collect();
    }

    match guild_id.member(ctx, msg.author.id).await {
        Ok(member) => member.roles.iter().map(|r| r.to_string()).collect(),
        Err(e) => {
            warn!(
                "Could not fetch roles for {} in guild {}: {}",
                msg.author.id, guild_id, e
            );
            Vec::new()
        }
    }
}

fn to_inbound(msg: &serenity::Message, roles: Vec<String>) -> InboundMessage {
    InboundMessage {
        author_id: msg.author.id.to_string(),
        author_name: msg.author.name.clone(),
        channel_id: msg.channel_id.to_string(),
        guild_id: msg.guild_id.map(|g| g.to_string()),
        content: msg.content.clone(),
        roles,
    }
}
