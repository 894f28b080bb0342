//! Standalone gift code redemption.
//!
//! Redeem codes for one player:
//!   redeem <playerID> <code[,code...]>
//!
//! Redeem one code for every player in a JSON file of `{discord_id, player_id}` entries:
//!   redeem --deploy <code> <players.json>
//!
//! The API salt and endpoint come from the settings file and `GIFTCODE_*` variables.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::collections::HashMap;
use std::sync::Arc;

use keeper::config::Settings;
use keeper::giftcode::{Deployer, GiftCodeClient};
use keeper::logging;
use keeper::models::Player;
use keeper::state::{JsonStore, SharedStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Redeem gift codes from the command line")]
struct Args {
    /// Application settings file
    #[arg(long, env = "KEEPER_CONFIG", default_value = "configs/config.json")]
    config: String,

    /// Redeem one code for every player listed in a JSON file
    #[arg(long, value_name = "CODE")]
    deploy: Option<String>,

    /// `<playerID> <codes>` or, with --deploy, `<players.json>`
    #[arg(required = true)]
    targets: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let settings = Settings::load(&args.config)?;
    logging::init(&settings.logging.level, logging::create_log_tail(1));

    if settings.gift_code.salt.is_empty() {
        bail!("gift_code.salt is not set (config file or GIFTCODE_SALT)");
    }
    let client = Arc::new(GiftCodeClient::from_settings(&settings.gift_code)?);

    match (&args.deploy, args.targets.as_slice()) {
        (Some(code), [players_file]) => {
            deploy(client, settings.gift_code.deploy_concurrency, code, players_file).await
        }
        (None, [player_id, codes]) => redeem(&client, player_id, codes).await,
        _ => bail!("usage: redeem <playerID> <code[,code...]> | redeem --deploy <code> <players.json>"),
    }
}

async fn redeem(client: &GiftCodeClient, player_id: &str, codes: &str) -> Result<()> {
    let profile = client
        .validate_player(player_id)
        .await
        .with_context(|| format!("player {} did not validate", player_id))?;
    println!(
        "Player {} ({})",
        profile.player_id,
        profile.nickname.as_deref().unwrap_or("unknown nickname")
    );

    for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        match client.redeem_code(player_id, code).await {
            Ok(outcome) => println!("{}: {}", code, outcome.message()),
            Err(e) => println!("{}: error: {}", code, e),
        }
    }

    Ok(())
}

async fn deploy(
    client: Arc<GiftCodeClient>,
    concurrency: usize,
    code: &str,
    players_file: &str,
) -> Result<()> {
    let content = tokio::fs::read_to_string(players_file)
        .await
        .with_context(|| format!("reading {}", players_file))?;
    let players: Vec<Player> =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", players_file))?;
    let players: HashMap<String, String> = players
        .into_iter()
        .map(|p| (p.discord_id, p.player_id))
        .collect();

    let store: SharedStore = Arc::new(JsonStore::in_memory());
    let report = Deployer::new(client, store, concurrency)
        .deploy(code, players)
        .await;

    for outcome in &report.outcomes {
        println!("{}", outcome.describe());
    }
    println!("{}", report.summary());

    Ok(())
}
