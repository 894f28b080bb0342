// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link between a Discord account and an in-game player ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub discord_id: String,
    pub player_id: String,
}

/// Glossary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub term: String,
    pub description: String,
}

/// Terminal status of one redemption attempt, as written to the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RedemptionStatus {
    Success,
    Failed,
    AlreadyClaimed,
}

impl std::fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RedemptionStatus::Success => "Success",
            RedemptionStatus::Failed => "Failed",
            RedemptionStatus::AlreadyClaimed => "AlreadyClaimed",
        };
        f.write_str(s)
    }
}

/// Append-only audit row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCodeRedemption {
    pub id: u64,
    pub discord_id: String,
    pub player_id: String,
    pub gift_code: String,
    pub status: RedemptionStatus,
    pub redeemed_at: DateTime<Utc>,
}

/// Audit row before the store has assigned it an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRedemption {
    pub discord_id: String,
    pub player_id: String,
    pub gift_code: String,
    pub status: RedemptionStatus,
}

/// A code found while scraping. Two codes are the same code when their tokens match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCode {
    pub code: String,
    pub description: String,
    pub source: String,
}

impl PartialEq for GiftCode {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for GiftCode {}

impl std::hash::Hash for GiftCode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

/// A page to scrape for codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSite {
    pub name: String,
    pub url: String,
    pub selector: String,
}

/// Outcome of scraping one site. An error here does not affect other sites.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub site_name: String,
    pub codes: Vec<GiftCode>,
    pub error: Option<String>,
}

/// A chat message as handed over by the transport
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub author_id: String,
    pub author_name: String,
    pub channel_id: String,
    /// None for direct messages
    pub guild_id: Option<String>,
    pub content: String,
    /// Role IDs the author holds in the guild the message came from
    pub roles: Vec<String>,
}

impl InboundMessage {
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }
}
