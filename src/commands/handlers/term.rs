use tracing::info;

use super::subcommand_help;
use crate::commands::registry::{handler, HandlerRegistry};
use crate::commands::Invocation;
use crate::error::{BotError, Result};

pub fn register(registry: &mut HandlerRegistry) {
    registry.register("handleTermCommand", handler(handle_term));
    registry.register("handleTermAddCommand", handler(handle_term_add));
    registry.register("handleTermEditCommand", handler(handle_term_edit));
    registry.register("handleTermRemoveCommand", handler(handle_term_remove));
    registry.register("handleTermListCommand", handler(handle_term_list));
}

fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Everything after the term, with literal `\n` turned into line breaks
fn description_from(args: &[String]) -> String {
    args.join(" ").replace("\\n", "\n")
}

async fn handle_term(inv: Invocation) -> Result<()> {
    let Some(term) = inv.args.first() else {
        return inv.reply(subcommand_help(&inv.command)).await;
    };

    match inv.ctx.store.get_term(&normalize_term(term)).await? {
        Some(entry) => {
            inv.reply(format!("**{}**: {}", entry.term, entry.description))
                .await
        }
        None => {
            inv.reply(format!(
                "Term '{}' not found. Use `{}term list` to see all terms.",
                term,
                inv.prefix()
            ))
            .await
        }
    }
}

async fn handle_term_add(inv: Invocation) -> Result<()> {
    inv.require_admin()?;
    if inv.args.len() < 2 {
        return inv.reply_usage().await;
    }

    let term = normalize_term(&inv.args[0]);
    match inv
        .ctx
        .store
        .add_term(&term, &description_from(&inv.args[1..]))
        .await
    {
        Ok(()) => {
            info!("Term '{}' added by {}", term, inv.message.author_name);
            inv.reply(format!("Term '{}' has been added.", term)).await
        }
        Err(BotError::AlreadyExists { .. }) => {
            inv.reply(format!(
                "Term '{}' already exists. Use `{}term edit` to change it.",
                term,
                inv.prefix()
            ))
            .await
        }
        Err(e) => Err(e),
    }
}

async fn handle_term_edit(inv: Invocation) -> Result<()> {
    inv.require_admin()?;
    if inv.args.len() < 2 {
        return inv.reply_usage().await;
    }

    let term = normalize_term(&inv.args[0]);
    match inv
        .ctx
        .store
        .edit_term(&term, &description_from(&inv.args[1..]))
        .await
    {
        Ok(()) => inv.reply(format!("Term '{}' has been updated.", term)).await,
        Err(BotError::NotFound { .. }) => inv.reply(format!("Term '{}' not found.", term)).await,
        Err(e) => Err(e),
    }
}

async fn handle_term_remove(inv: Invocation) -> Result<()> {
    inv.require_admin()?;
    let Some(term) = inv.args.first() else {
        return inv.reply_usage().await;
    };

    let term = normalize_term(term);
    match inv.ctx.store.remove_term(&term).await {
        Ok(()) => inv.reply(format!("Term '{}' has been removed.", term)).await,
        Err(BotError::NotFound { .. }) => inv.reply(format!("Term '{}' not found.", term)).await,
        Err(e) => Err(e),
    }
}

async fn handle_term_list(inv: Invocation) -> Result<()> {
    let terms = inv.ctx.store.list_terms().await?;
    if terms.is_empty() {
        return inv.reply("No terms have been added yet.").await;
    }

    let mut message = String::from("Term List:\n");
    for term in terms {
        message.push_str(&format!("{}: {}\n", term.term, term.description));
    }
    inv.reply(message).await
}
