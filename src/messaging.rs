use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BotError, Result};

/// Discord refuses messages longer than this
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Outbound side of the chat transport
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post text to a channel
    async fn send(&self, channel_id: &str, text: &str) -> Result<()>;

    /// Send a direct message, returning the DM channel ID
    async fn send_direct(&self, user_id: &str, text: &str) -> Result<String>;
}

/// Shared messenger type
pub type SharedMessenger = Arc<dyn Messenger>;

/// Messenger backed by serenity's HTTP client
pub struct DiscordMessenger {
    http: Arc<serenity::Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn parse_id(kind: &str, id: &str) -> Result<u64> {
    id.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| BotError::Discord {
            message: format!("invalid {} ID '{}'", kind, id),
        })
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        let channel = serenity::ChannelId::new(parse_id("channel", channel_id)?);
        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            channel.say(&*self.http, chunk).await?;
        }
        debug!("Sent message to channel {}", channel_id);
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> Result<String> {
        let user = serenity::UserId::new(parse_id("user", user_id)?);
        let dm = user.create_dm_channel(&*self.http).await?;
        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            dm.id.say(&*self.http, chunk).await?;
        }
        debug!("Sent direct message to user {}", user_id);
        Ok(dm.id.to_string())
    }
}

/// Messenger that only logs. Used when the bot runs without a Discord connection.
#[derive(Debug, Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        info!("[channel {}] {}", channel_id, text);
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, text: &str) -> Result<String> {
        info!("[dm {}] {}", user_id, text);
        Ok(format!("log-dm-{}", user_id))
    }
}

/// Split text into chunks of at most `limit` characters, breaking on line
/// boundaries where possible
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(current.trim_end_matches('\n').to_string());
            current.clear();
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                if piece.len() == limit {
                    chunks.push(piece.iter().collect());
                } else {
                    current = piece.iter().collect();
                    current_len = piece.len();
                }
            }
        } else {
            current.push_str(line);
            current_len += line_len;
        }
    }

    let rest = current.trim_end_matches('\n');
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_one_chunk() {
        assert_eq!(split_message("hello\nworld", 2000), vec!["hello\nworld"]);
        assert!(split_message("", 2000).is_empty());
    }

    #[test]
    fn test_splits_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 10), vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_hard_splits_long_lines() {
        let text = "x".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        assert!(parse_id("channel", "abc").is_err());
        assert!(parse_id("channel", "0").is_err());
        assert_eq!(parse_id("channel", "42").unwrap(), 42);
    }
}
