//! Gateway event plumbing between serenity and the [`Bot`](crate::bot::Bot).

pub mod guild;
pub mod message;

use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::error;

use crate::bot::Bot;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Framework user data
pub struct Data {
    pub bot: Arc<Bot>,
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = message::handle_message(ctx, new_message, data).await {
                error!("Failed to handle message: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = guild::handle_member_add(new_member, data).await {
                error!("Failed to handle new member: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}
