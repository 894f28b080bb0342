use poise::serenity_prelude as serenity;
use tracing::info;

use super::{Data, Error};

/// Greet a member who just joined
pub async fn handle_member_add(new_member: &serenity::Member, data: &Data) -> Result<(), Error> {
    if new_member.user.bot {
        return Ok(());
    }

    info!(
        "New member joined: {} in guild {}",
        new_member.user.name, new_member.guild_id
    );

    data.bot
        .greet_member(&new_member.user.id.to_string())
        .await?;
    Ok(())
}
