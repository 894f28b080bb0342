use crate::commands::registry::{handler, HandlerRegistry};
use crate::commands::Invocation;
use crate::error::Result;

pub fn register(registry: &mut HandlerRegistry) {
    registry.register("handleHelpCommand", handler(handle_help));
}

async fn handle_help(inv: Invocation) -> Result<()> {
    let prefix = inv.prefix();

    let Some(name) = inv.args.first() else {
        let mut message = String::from("Available commands:\n");
        for command in inv.commands.visible() {
            message.push_str(&format!("{}{}: {}\n", prefix, command.name, command.description));
        }
        message.push_str(&format!(
            "\nUse {}help <command> for more information on a specific command.",
            prefix
        ));
        return inv.reply(message).await;
    };

    let Some(command) = inv.commands.get(name).filter(|c| !c.hidden) else {
        return inv.reply("Unknown command.").await;
    };

    let mut message = format!("Help for {}{}:\n", prefix, command.name);
    message.push_str(&format!("Description: {}\n", command.description));
    message.push_str(&format!("Usage: {}\n", command.usage));
    if !command.cooldown_spec.is_empty() {
        message.push_str(&format!("Cooldown: {}\n", command.cooldown_spec));
    }

    let mut subcommands = command.visible_subcommands().peekable();
    if subcommands.peek().is_some() {
        message.push_str("Subcommands:\n");
        for sub in subcommands {
            message.push_str(&format!("  {}: {}\n", sub.name, sub.description));
        }
    }

    inv.reply(message).await
}
