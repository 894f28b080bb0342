//! Per-user, per-command cooldown tracking.
//!
//! Entries are keyed by `(user_id, command path)` and hold the instant the
//! cooldown expires. Expired entries read as "allowed" and are removed lazily
//! on access or by [`CooldownStore::purge_expired`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

type CooldownKey = (String, String);

#[derive(Debug, Default)]
pub struct CooldownStore {
    entries: Mutex<HashMap<CooldownKey, Instant>>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before `user_id` may run `path` again, or None when allowed
    pub fn remaining(&self, user_id: &str, path: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let key = (user_id.to_string(), path.to_string());

        match entries.get(&key).copied() {
            Some(expires_at) if expires_at > now => Some(expires_at - now),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn check(&self, user_id: &str, path: &str) -> bool {
        self.remaining(user_id, path).is_none()
    }

    /// Start (or restart) the cooldown window. A `None` or zero cooldown records nothing.
    pub fn set(&self, user_id: &str, path: &str, cooldown: Option<Duration>) {
        let Some(cooldown) = cooldown.filter(|d| !d.is_zero()) else {
            return;
        };

        self.entries
            .lock()
            .insert((user_id.to_string(), path.to_string()), Instant::now() + cooldown);

        debug!(
            "Cooldown for '{}' set for user {} ({:?})",
            path, user_id, cooldown
        );
    }

    /// Check and claim in one step. On success the window starts now; when the
    /// user is still cooling down the entry is left untouched and the remaining
    /// time is returned.
    pub fn try_acquire(
        &self,
        user_id: &str,
        path: &str,
        cooldown: Option<Duration>,
    ) -> Result<(), Duration> {
        let Some(cooldown) = cooldown.filter(|d| !d.is_zero()) else {
            return Ok(());
        };

        let now = Instant::now();
        let mut entries = self.entries.lock();
        let key = (user_id.to_string(), path.to_string());

        if let Some(expires_at) = entries.get(&key).copied() {
            if expires_at > now {
                return Err(expires_at - now);
            }
        }

        entries.insert(key, now + cooldown);
        Ok(())
    }

    /// Clear a user's cooldown for one command
    pub fn reset(&self, user_id: &str, path: &str) {
        self.entries
            .lock()
            .remove(&(user_id.to_string(), path.to_string()));
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared cooldown store type
pub type SharedCooldownStore = Arc<CooldownStore>;

pub fn create_shared_cooldown_store() -> SharedCooldownStore {
    Arc::new(CooldownStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_SECONDS: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn test_rejects_within_window_and_accepts_after() {
        let store = CooldownStore::new();

        assert!(store.try_acquire("u1", "term.add", Some(TEN_SECONDS)).is_ok());
        let remaining = store
            .try_acquire("u1", "term.add", Some(TEN_SECONDS))
            .unwrap_err();
        assert_eq!(remaining, TEN_SECONDS);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(
            store.remaining("u1", "term.add"),
            Some(Duration::from_secs(6))
        );

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.check("u1", "term.add"));
        assert!(store.try_acquire("u1", "term.add", Some(TEN_SECONDS)).is_ok());

        // Acceptance restarted the window
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!store.check("u1", "term.add"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_refresh_window() {
        let store = CooldownStore::new();
        store.set("u1", "id.add", Some(TEN_SECONDS));

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.try_acquire("u1", "id.add", Some(TEN_SECONDS)).is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.try_acquire("u1", "id.add", Some(TEN_SECONDS)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let store = CooldownStore::new();
        store.set("u1", "term.add", Some(TEN_SECONDS));

        assert!(!store.check("u1", "term.add"));
        assert!(store.check("u2", "term.add"));
        assert!(store.check("u1", "term"));
    }

    #[test]
    fn test_zero_or_missing_cooldown_is_never_recorded() {
        let store = CooldownStore::new();
        store.set("u1", "help", None);
        store.set("u1", "help", Some(Duration::ZERO));
        assert!(store.try_acquire("u1", "help", None).is_ok());
        assert!(store.try_acquire("u1", "help", None).is_ok());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = CooldownStore::new();
        store.set("u1", "a", Some(Duration::from_secs(1)));
        store.set("u1", "b", Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);

        store.reset("u1", "b");
        assert!(store.is_empty());
    }
}
