use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::database::BotDatabase;
use crate::error::Result;
use crate::models::{GiftCodeRedemption, NewRedemption, Player, Term};

/// Persistence surface used by the command handlers and the deployment orchestrator.
/// Every mutating call is its own commit.
#[async_trait]
pub trait Store: Send + Sync {
    // Players
    async fn upsert_player(&self, discord_id: &str, player_id: &str) -> Result<()>;
    async fn get_player(&self, discord_id: &str) -> Result<Option<Player>>;
    async fn remove_player(&self, discord_id: &str) -> Result<()>;
    async fn list_players(&self) -> Result<Vec<Player>>;
    /// Discord ID -> player ID for every known player
    async fn player_map(&self) -> Result<HashMap<String, String>>;

    // Terms
    async fn add_term(&self, term: &str, description: &str) -> Result<()>;
    async fn edit_term(&self, term: &str, description: &str) -> Result<()>;
    async fn remove_term(&self, term: &str) -> Result<()>;
    async fn get_term(&self, term: &str) -> Result<Option<Term>>;
    async fn list_terms(&self) -> Result<Vec<Term>>;

    // Redemption audit log
    async fn record_redemption(&self, row: NewRedemption) -> Result<GiftCodeRedemption>;
    /// Newest first, optionally filtered by Discord ID
    async fn list_redemptions(
        &self,
        discord_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<GiftCodeRedemption>>;
}

/// Shared store type
pub type SharedStore = Arc<dyn Store>;

/// Store backed by a single JSON document, rewritten after each mutation.
/// Without a path it only lives in memory.
pub struct JsonStore {
    path: Option<String>,
    db: RwLock<BotDatabase>,
}

impl JsonStore {
    pub async fn open(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let db = BotDatabase::load(path).await?;
        info!(
            "Loaded state from {}: {} players, {} terms, {} redemptions",
            path,
            db.players.len(),
            db.terms.len(),
            db.redemptions.len()
        );

        Ok(Self {
            path: Some(path.to_string()),
            db: RwLock::new(db),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            db: RwLock::new(BotDatabase::new()),
        }
    }

    async fn persist(&self, db: &BotDatabase) -> Result<()> {
        if let Some(path) = &self.path {
            db.save(path).await?;
            debug!("State saved to {}", path);
        }
        Ok(())
    }

    /// Run a mutation and save. On a failed save the in-memory change is rolled back.
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BotDatabase) -> Result<T> + Send,
        T: Send,
    {
        let mut db = self.db.write().await;
        let snapshot = self.path.as_ref().map(|_| db.clone());
        let value = f(&mut *db)?;

        if let Err(e) = self.persist(&db).await {
            if let Some(snapshot) = snapshot {
                *db = snapshot;
            }
            return Err(e);
        }

        Ok(value)
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn upsert_player(&self, discord_id: &str, player_id: &str) -> Result<()> {
        self.mutate(|db| {
            db.upsert_player(discord_id, player_id);
            Ok(())
        })
        .await
    }

    async fn get_player(&self, discord_id: &str) -> Result<Option<Player>> {
        Ok(self.db.read().await.players.get(discord_id).cloned())
    }

    async fn remove_player(&self, discord_id: &str) -> Result<()> {
        self.mutate(|db| db.remove_player(discord_id).map(|_| ())).await
    }

    async fn list_players(&self) -> Result<Vec<Player>> {
        Ok(self.db.read().await.list_players())
    }

    async fn player_map(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .db
            .read()
            .await
            .players
            .values()
            .map(|p| (p.discord_id.clone(), p.player_id.clone()))
            .collect())
    }

    async fn add_term(&self, term: &str, description: &str) -> Result<()> {
        self.mutate(|db| db.add_term(term, description)).await
    }

    async fn edit_term(&self, term: &str, description: &str) -> Result<()> {
        self.mutate(|db| db.edit_term(term, description)).await
    }

    async fn remove_term(&self, term: &str) -> Result<()> {
        self.mutate(|db| db.remove_term(term)).await
    }

    async fn get_term(&self, term: &str) -> Result<Option<Term>> {
        Ok(self.db.read().await.terms.get(term).cloned())
    }

    async fn list_terms(&self) -> Result<Vec<Term>> {
        Ok(self.db.read().await.terms.values().cloned().collect())
    }

    async fn record_redemption(&self, row: NewRedemption) -> Result<GiftCodeRedemption> {
        self.mutate(|db| Ok(db.append_redemption(row))).await
    }

    async fn list_redemptions(
        &self,
        discord_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<GiftCodeRedemption>> {
        Ok(self
            .db
            .read()
            .await
            .list_redemptions(discord_id, offset, limit))
    }
}

pub async fn create_shared_store(path: &str) -> Result<SharedStore> {
    Ok(Arc::new(JsonStore::open(path).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RedemptionStatus;

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let path = path.to_str().unwrap();

        {
            let store = JsonStore::open(path).await.unwrap();
            store.upsert_player("d1", "12345").await.unwrap();
            store.add_term("svs", "State vs State").await.unwrap();
            store
                .record_redemption(NewRedemption {
                    discord_id: "d1".to_string(),
                    player_id: "12345".to_string(),
                    gift_code: "ABC".to_string(),
                    status: RedemptionStatus::Success,
                })
                .await
                .unwrap();
        }

        let reopened = JsonStore::open(path).await.unwrap();
        assert_eq!(
            reopened.get_player("d1").await.unwrap().unwrap().player_id,
            "12345"
        );
        assert!(reopened.get_term("svs").await.unwrap().is_some());
        let rows = reopened.list_redemptions(Some("d1"), 0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, RedemptionStatus::Success);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state_untouched() {
        let store = JsonStore::in_memory();
        store.add_term("svs", "one").await.unwrap();
        assert!(store.add_term("svs", "two").await.is_err());
        assert_eq!(
            store.get_term("svs").await.unwrap().unwrap().description,
            "one"
        );
        assert!(store.remove_player("nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_player_map() {
        let store = JsonStore::in_memory();
        store.upsert_player("d1", "111").await.unwrap();
        store.upsert_player("d2", "222").await.unwrap();

        let map = store.player_map().await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["d2"], "222");
    }
}
