// src/messages.rs

pub fn welcome_message(name: &str) -> String {
    format!(
        "Welcome to the server, {}! 🎉\n\n\
        I am **The Keeper**, a bot.\n\n\
        Please reply with your Whiteout Survival Player ID \
        to take full advantage of my features.",
        name
    )
}

pub fn greeting_success_message(player_id: &str) -> String {
    format!(
        "✅ Player ID **{}** successfully associated! You are now ready to participate.",
        player_id
    )
}

pub fn greeting_failure_message() -> String {
    "⚠️ An error occurred while adding your Player ID. Please try again later or contact an admin."
        .to_string()
}

pub fn invalid_player_id_message() -> String {
    "❌ Invalid Player ID. It should be a number between 3 and 12 digits.".to_string()
}

pub fn missing_player_id_message(prefix: &str) -> String {
    format!(
        "❌ You do not have a Player ID associated. Use `{}id add <PlayerID>` to associate your account.",
        prefix
    )
}

pub fn permission_denied_message() -> String {
    "❌ You do not have permission to use this command.".to_string()
}

pub fn unknown_command_message(prefix: &str) -> String {
    format!(
        "Unknown command. Use `{}help` to see available commands.",
        prefix
    )
}

pub fn not_implemented_message(command: &str) -> String {
    format!("Command '{}' is not implemented yet.", command)
}
