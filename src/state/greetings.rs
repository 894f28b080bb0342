use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Users who were greeted and have not yet replied with their player ID
#[derive(Debug, Default)]
pub struct GreetingTracker {
    /// Discord user ID -> DM channel ID and greeting time (Unix seconds)
    pending: DashMap<String, PendingGreeting>,
}

#[derive(Debug, Clone)]
pub struct PendingGreeting {
    pub dm_channel_id: String,
    pub started_at: u64,
}

/// Greetings nobody answered within a day are forgotten
const GREETING_TTL_SECS: u64 = 24 * 3600;

impl GreetingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, user_id: &str, dm_channel_id: &str) {
        self.pending.insert(
            user_id.to_string(),
            PendingGreeting {
                dm_channel_id: dm_channel_id.to_string(),
                started_at: current_timestamp(),
            },
        );
        debug!("Awaiting player ID from user {}", user_id);
    }

    pub fn is_pending(&self, user_id: &str) -> bool {
        self.pending.contains_key(user_id)
    }

    pub fn get(&self, user_id: &str) -> Option<PendingGreeting> {
        self.pending.get(user_id).map(|r| r.clone())
    }

    pub fn finish(&self, user_id: &str) {
        self.pending.remove(user_id);
    }

    /// Clean up greetings older than a day
    pub fn cleanup_stale(&self) {
        let cutoff = current_timestamp().saturating_sub(GREETING_TTL_SECS);
        self.pending.retain(|_, v| v.started_at > cutoff);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Shared greeting tracker type
pub type SharedGreetingTracker = Arc<GreetingTracker>;

pub fn create_shared_greeting_tracker() -> SharedGreetingTracker {
    Arc::new(GreetingTracker::new())
}

fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_lifecycle() {
        let tracker = GreetingTracker::new();
        tracker.start("u1", "dm1");
        assert!(tracker.is_pending("u1"));
        assert_eq!(tracker.get("u1").unwrap().dm_channel_id, "dm1");

        tracker.cleanup_stale();
        assert_eq!(tracker.len(), 1);

        tracker.finish("u1");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_stale_greetings_are_dropped() {
        let tracker = GreetingTracker::new();
        tracker.pending.insert(
            "old".to_string(),
            PendingGreeting {
                dm_channel_id: "dm".to_string(),
                started_at: current_timestamp() - GREETING_TTL_SECS - 10,
            },
        );
        tracker.cleanup_stale();
        assert!(!tracker.is_pending("old"));
    }
}
