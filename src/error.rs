use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    #[error("Invalid duration '{value}': {message}")]
    InvalidDuration { value: String, message: String },

    #[error("Handler '{handler}' not found for command '{path}'")]
    UnresolvedHandler { path: String, handler: String },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Persistence errors
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },

    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: String, key: String },

    // Gift code API errors
    #[error("Gift code API request failed: {message}")]
    GiftCodeTransport { message: String },

    #[error("Gift code API request timed out")]
    GiftCodeTimeout,

    #[error("Invalid gift code API response: {message}")]
    GiftCodeResponse { message: String },

    #[error("Login/validation failed for player {player_id}: {message}")]
    PlayerValidation { player_id: String, message: String },

    // Scrape errors
    #[error("Failed to scrape '{site}': {message}")]
    Scrape { site: String, message: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Permission errors
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    pub fn not_found(kind: &str, key: &str) -> Self {
        BotError::NotFound {
            kind: kind.to_string(),
            key: key.to_string(),
        }
    }

    pub fn already_exists(kind: &str, key: &str) -> Self {
        BotError::AlreadyExists {
            kind: kind.to_string(),
            key: key.to_string(),
        }
    }

    /// True for failures talking to the gift code API (network, timeout, bad body),
    /// as opposed to a classified redemption outcome or a validation refusal.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BotError::GiftCodeTransport { .. }
                | BotError::GiftCodeTimeout
                | BotError::GiftCodeResponse { .. }
        )
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BotError::GiftCodeTimeout
        } else if err.is_decode() {
            BotError::GiftCodeResponse {
                message: err.to_string(),
            }
        } else {
            BotError::GiftCodeTransport {
                message: err.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
