use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{BotError, Result};
use crate::models::{GiftCodeRedemption, NewRedemption, Player, Term};

const SCHEMA_VERSION: u32 = 1;

/// Everything the bot persists: player links, glossary and the redemption audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotDatabase {
    /// Schema version for migrations
    pub version: u32,

    /// Last update timestamp
    pub last_updated: DateTime<Utc>,

    /// Map of Discord ID to player link
    pub players: HashMap<String, Player>,

    /// Glossary, keyed by term
    pub terms: BTreeMap<String, Term>,

    /// Audit log, in insertion order. Rows are never modified or removed.
    pub redemptions: Vec<GiftCodeRedemption>,

    /// Id handed to the next audit row
    pub next_redemption_id: u64,
}

impl Default for BotDatabase {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_updated: Utc::now(),
            players: HashMap::new(),
            terms: BTreeMap::new(),
            redemptions: Vec::new(),
            next_redemption_id: 1,
        }
    }
}

impl BotDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file, or create new if not exists
    pub async fn load(path: &str) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let mut db: BotDatabase =
                    serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
                        path: path.to_string(),
                        source: e,
                    })?;

                // Repair the id counter if the file was edited by hand
                let max_id = db.redemptions.iter().map(|r| r.id).max().unwrap_or(0);
                if db.next_redemption_id <= max_id {
                    tracing::warn!(
                        "Redemption id counter {} is behind highest id {}, repairing",
                        db.next_redemption_id,
                        max_id
                    );
                    db.next_redemption_id = max_id + 1;
                }

                Ok(db)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(BotError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        Ok(())
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    // ========== Players ==========

    pub fn upsert_player(&mut self, discord_id: &str, player_id: &str) {
        self.players.insert(
            discord_id.to_string(),
            Player {
                discord_id: discord_id.to_string(),
                player_id: player_id.to_string(),
            },
        );
        self.touch();
    }

    pub fn remove_player(&mut self, discord_id: &str) -> Result<Player> {
        let removed = self
            .players
            .remove(discord_id)
            .ok_or_else(|| BotError::not_found("Player", discord_id))?;
        self.touch();
        Ok(removed)
    }

    /// All players ordered by Discord ID
    pub fn list_players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by(|a, b| a.discord_id.cmp(&b.discord_id));
        players
    }

    // ========== Terms ==========

    pub fn add_term(&mut self, term: &str, description: &str) -> Result<()> {
        if self.terms.contains_key(term) {
            return Err(BotError::already_exists("Term", term));
        }
        self.terms.insert(
            term.to_string(),
            Term {
                term: term.to_string(),
                description: description.to_string(),
            },
        );
        self.touch();
        Ok(())
    }

    pub fn edit_term(&mut self, term: &str, description: &str) -> Result<()> {
        let entry = self
            .terms
            .get_mut(term)
            .ok_or_else(|| BotError::not_found("Term", term))?;
        entry.description = description.to_string();
        self.touch();
        Ok(())
    }

    pub fn remove_term(&mut self, term: &str) -> Result<()> {
        self.terms
            .remove(term)
            .ok_or_else(|| BotError::not_found("Term", term))?;
        self.touch();
        Ok(())
    }

    // ========== Redemptions ==========

    pub fn append_redemption(&mut self, row: NewRedemption) -> GiftCodeRedemption {
        let redemption = GiftCodeRedemption {
            id: self.next_redemption_id,
            discord_id: row.discord_id,
            player_id: row.player_id,
            gift_code: row.gift_code,
            status: row.status,
            redeemed_at: Utc::now(),
        };
        self.next_redemption_id += 1;
        self.redemptions.push(redemption.clone());
        self.touch();
        redemption
    }

    /// Newest first, optionally restricted to one Discord user. `offset`/`limit` apply after filtering.
    pub fn list_redemptions(
        &self,
        discord_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Vec<GiftCodeRedemption> {
        let mut rows: Vec<&GiftCodeRedemption> = self
            .redemptions
            .iter()
            .filter(|r| discord_id.map_or(true, |id| r.discord_id == id))
            .collect();
        rows.sort_by(|a, b| b.redeemed_at.cmp(&a.redeemed_at).then(b.id.cmp(&a.id)));
        rows.into_iter().skip(offset).take(limit).cloned().collect()
    }
}
