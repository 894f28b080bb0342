use tracing::{error, info};

use crate::commands::registry::{handler, HandlerRegistry};
use crate::commands::Invocation;
use crate::error::Result;
use crate::scrape::format_results;

pub fn register(registry: &mut HandlerRegistry) {
    registry.register("handleScrapeCommand", handler(handle_scrape));
}

/// Runs a scrape cycle in the background and reports back to the channel
async fn handle_scrape(inv: Invocation) -> Result<()> {
    if inv.ctx.scraper.sites().is_empty() {
        return inv.reply("No scrape sites are configured.").await;
    }

    info!("Manual scraping initiated by {}", inv.message.author_name);
    inv.reply("🔎 Scraping gift code sites...").await?;

    let ctx = inv.ctx.clone();
    let channel_id = inv.message.channel_id.clone();
    tokio::spawn(async move {
        let cycle = ctx.scraper.run_cycle().await;
        let mut report = format_results(&cycle.results);
        if !cycle.new_codes.is_empty() {
            report.push_str(&format!("New codes: {}\n", cycle.new_codes.len()));
        }
        if let Err(e) = ctx.messenger.send(&channel_id, &report).await {
            error!("Failed to send scrape results: {}", e);
        }
    });

    Ok(())
}
