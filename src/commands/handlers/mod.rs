//! Command handlers.
//!
//! Each module exposes `register`, which binds its handlers under the names
//! used in configs/commands.json. [`register_all`] is the single place the
//! bot collects them.

pub mod giftcode;
pub mod help;
pub mod id;
pub mod scrape;
pub mod term;
pub mod welcome;

use super::dispatcher::Command;
use super::registry::HandlerRegistry;

pub fn register_all(registry: &mut HandlerRegistry) {
    help::register(registry);
    id::register(registry);
    term::register(registry);
    giftcode::register(registry);
    scrape::register(registry);
    welcome::register(registry);
}

/// Player IDs are 3 to 12 ASCII digits
pub fn is_valid_player_id(player_id: &str) -> bool {
    (3..=12).contains(&player_id.len()) && player_id.bytes().all(|b| b.is_ascii_digit())
}

/// Listing of a command's visible subcommands
pub fn subcommand_help(command: &Command) -> String {
    let mut message = format!("Available {} subcommands:\n", command.name);
    for sub in command.visible_subcommands() {
        message.push_str(&format!("  {}: {}\n", sub.name, sub.description));
        message.push_str(&format!("    Usage: {}\n", sub.usage));
        if !sub.cooldown_spec.is_empty() {
            message.push_str(&format!("    Cooldown: {}\n", sub.cooldown_spec));
        }
    }
    message
}
