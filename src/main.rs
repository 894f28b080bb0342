use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use keeper::bot::{Bot, BotContext};
use keeper::config::{CommandsConfig, Settings};
use keeper::events::{event_handler, Data};
use keeper::logging;
use keeper::messaging::{DiscordMessenger, LogMessenger, SharedMessenger};
use keeper::scrape::Scraper;
use keeper::state::create_shared_store;
use keeper::web;

/// Guild bot: commands, gift code redemption and code scraping
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Application settings file
    #[arg(long, env = "KEEPER_CONFIG", default_value = "configs/config.json")]
    config: String,

    /// Command tree file (overrides paths.commands_config)
    #[arg(long)]
    commands: Option<String>,

    /// Run the web server and periodic scraping without connecting to Discord
    #[arg(long)]
    no_discord: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::load(&args.config)?;
    if args.no_discord {
        settings.discord.enabled = false;
    }

    let log_tail = logging::create_log_tail(1000);
    logging::init(&settings.logging.level, log_tail.clone());

    settings.validate()?;

    let commands_path = args
        .commands
        .clone()
        .unwrap_or_else(|| settings.paths.commands_config.clone());
    info!("Loading command tree from {}", commands_path);
    let commands = CommandsConfig::load_from_file(&commands_path)?;

    let store = create_shared_store(&settings.state_file()).await?;

    if !settings.discord.client_id.is_empty() {
        info!("Invite URL: {}", web::invite_url(&settings.discord.client_id));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if settings.server.enabled {
        let port = settings.server.port;
        let state = web::WebState {
            log_tail: log_tail.clone(),
        };
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = web::start_web_server(port, state, shutdown).await {
                error!("Web server error: {}", e);
            }
        });
    }

    if !settings.discord.enabled {
        warn!("Discord is disabled; new codes will only be logged");
        let messenger: SharedMessenger = Arc::new(LogMessenger);
        let scraper = Arc::new(Scraper::from_settings(&settings, messenger)?);
        if settings.scrape.enabled {
            let interval = Duration::from_secs(settings.scrape.interval_secs.max(1));
            tokio::spawn(scraper.run_periodic(interval, shutdown_rx.clone()));
        }

        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        shutdown_tx.send(true).ok();
        return Ok(());
    }

    let token = settings.discord.token.clone();
    log_bot_id(&token);

    let setup_settings = settings.clone();
    let setup_shutdown = shutdown_rx.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);

                let messenger: SharedMessenger = Arc::new(DiscordMessenger::new(ctx.http.clone()));
                let scrape_enabled = setup_settings.scrape.enabled;
                let interval = Duration::from_secs(setup_settings.scrape.interval_secs.max(1));

                let bot_ctx = BotContext::new(setup_settings, store, messenger)?;
                let bot = Arc::new(Bot::new(bot_ctx, &commands)?);

                if scrape_enabled {
                    let scraper = bot.ctx().scraper.clone();
                    tokio::spawn(scraper.run_periodic(interval, setup_shutdown));
                }

                Ok(Data { bot })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shutdown_tx.send(true).ok();
            shard_manager.shutdown_all().await;
        }
    });

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        error!("Failed to start bot: {}", e);
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}

/// The first token segment is the base64 encoded application ID
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(segment) = token.split('.').next() else {
        return;
    };
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(segment)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(segment));

    if let Ok(Ok(id)) = decoded.map(String::from_utf8) {
        info!(
            "Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)",
            id, id
        );
    }
}
