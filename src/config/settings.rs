use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BotError, Result};
use crate::models::ScrapeSite;

/// Application settings, loaded from configs/config.json and overridden by environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub discord: DiscordSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub paths: PathSettings,
    pub gift_code: GiftCodeSettings,
    pub scrape: ScrapeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    pub enabled: bool,
    pub token: String,
    pub client_id: String,
    /// Holders of this role may run admin commands
    pub admin_role_id: String,
    /// Channel that receives new-code notifications
    pub notification_channel_id: String,
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            token: String::new(),
            client_id: String::new(),
            admin_role_id: String::new(),
            notification_channel_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub commands_config: String,
    /// Directory holding the bot's JSON state file
    pub state_path: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            commands_config: "configs/commands.json".to_string(),
            state_path: "state".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GiftCodeSettings {
    pub salt: String,
    pub api_endpoint: String,
    pub api_timeout_secs: u64,
    pub min_length: usize,
    pub max_length: usize,
    /// Upper bound on simultaneous redemptions during a deployment
    pub deploy_concurrency: usize,
}

impl Default for GiftCodeSettings {
    fn default() -> Self {
        Self {
            salt: String::new(),
            api_endpoint: "https://wos-giftcode-api.centurygame.com/api".to_string(),
            api_timeout_secs: 30,
            min_length: 4,
            max_length: 20,
            deploy_concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Overall deadline for one scrape cycle
    pub deadline_secs: u64,
    pub sites: Vec<ScrapeSite>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            deadline_secs: 300,
            sites: vec![],
        }
    }
}

impl Settings {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No config file found at {}. Using default values and environment variables.",
                    path
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(BotError::ConfigLoad {
                    path: path.to_string(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })
    }

    /// Load the file, then apply environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let mut settings = Self::load_from_file(path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("DISCORD_TOKEN").or_else(|| get("DISCORD_BOT_TOKEN")) {
            self.discord.token = token;
        }
        if let Some(client_id) = get("DISCORD_CLIENT_ID") {
            self.discord.client_id = client_id;
        }
        if let Some(role_id) = get("DISCORD_ROLE_ID") {
            self.discord.admin_role_id = role_id;
        }
        if let Some(channel_id) = get("DISCORD_NOTIFICATION_CHANNEL_ID") {
            self.discord.notification_channel_id = channel_id;
        }
        if let Some(state_path) = get("STATE_PATH") {
            self.paths.state_path = state_path;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(salt) = get("GIFTCODE_SALT") {
            self.gift_code.salt = salt;
        }
        if let Some(endpoint) = get("GIFTCODE_API_ENDPOINT") {
            self.gift_code.api_endpoint = endpoint;
        }
    }

    /// Reject settings the bot cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.discord.enabled && self.discord.token.is_empty() {
            return Err(BotError::ConfigValidation {
                message: "Discord token is not set".to_string(),
            });
        }
        if self.gift_code.api_endpoint.is_empty() {
            return Err(BotError::ConfigValidation {
                message: "Gift code API endpoint is not set".to_string(),
            });
        }
        if self.gift_code.deploy_concurrency == 0 {
            return Err(BotError::ConfigValidation {
                message: "gift_code.deploy_concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Path of the JSON state file
    pub fn state_file(&self) -> String {
        format!("{}/keeper_state.json", self.paths.state_path)
    }
}
