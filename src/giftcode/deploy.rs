//! Fleet-wide redemption.
//!
//! One code is redeemed for every known player through a bounded pool of
//! in-flight requests. Each attempt ends in exactly one audit row, whatever
//! happened upstream; a row that could not be written is reported separately
//! since the redemption itself cannot be undone.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::client::{GiftCodeClient, RedeemOutcome};
use crate::error::{BotError, Result};
use crate::messaging::Messenger;
use crate::models::{NewRedemption, RedemptionStatus};
use crate::state::SharedStore;

/// What happened upstream for one player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Redeemed(RedeemOutcome),
    ValidationFailed(String),
    TransportFailed(String),
}

impl AttemptResult {
    pub fn status(&self) -> RedemptionStatus {
        match self {
            AttemptResult::Redeemed(outcome) => outcome.status(),
            _ => RedemptionStatus::Failed,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AttemptResult::Redeemed(outcome) => outcome.message(),
            AttemptResult::ValidationFailed(msg) => format!("Login/validation failed: {}", msg),
            // Details stay in the log and the variant
            AttemptResult::TransportFailed(_) => {
                "Could not reach the gift code service, please try again later".to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerOutcome {
    pub discord_id: String,
    pub player_id: String,
    pub result: AttemptResult,
    /// Set when the audit row could not be written
    pub record_error: Option<String>,
}

impl PlayerOutcome {
    pub fn status(&self) -> RedemptionStatus {
        self.result.status()
    }

    /// Redeemed upstream but missing from the audit log
    pub fn redeemed_but_unrecorded(&self) -> bool {
        self.record_error.is_some() && self.status() == RedemptionStatus::Success
    }

    /// Line shown to the user for this attempt
    pub fn describe(&self) -> String {
        match (&self.record_error, self.status()) {
            (Some(e), RedemptionStatus::Success) => format!(
                "⚠️ Gift code redeemed for Player ID {} but failed to record: {}",
                self.player_id, e
            ),
            (Some(e), _) => format!(
                "Player ID {}: {} (not recorded: {})",
                self.player_id,
                self.result.message(),
                e
            ),
            (None, _) => format!("Player ID {}: {}", self.player_id, self.result.message()),
        }
    }
}

/// Validate, redeem and write the audit row for one player
pub async fn redeem_and_record(
    client: &GiftCodeClient,
    store: &SharedStore,
    discord_id: &str,
    player_id: &str,
    gift_code: &str,
) -> PlayerOutcome {
    let result = match client.redeem_for_player(player_id, gift_code).await {
        Ok(outcome) => AttemptResult::Redeemed(outcome),
        Err(BotError::PlayerValidation { message, .. }) => {
            warn!(
                "Player {} failed validation for gift code {}: {}",
                player_id, gift_code, message
            );
            AttemptResult::ValidationFailed(message)
        }
        Err(e) => {
            error!(
                "Error redeeming gift code {} for player {}: {}",
                gift_code, player_id, e
            );
            AttemptResult::TransportFailed(e.to_string())
        }
    };

    let row = NewRedemption {
        discord_id: discord_id.to_string(),
        player_id: player_id.to_string(),
        gift_code: gift_code.to_string(),
        status: result.status(),
    };

    let record_error = match store.record_redemption(row).await {
        Ok(_) => None,
        Err(e) => {
            error!(
                "Gift code {} attempt for player {} ({}) not recorded: {}",
                gift_code,
                player_id,
                result.status(),
                e
            );
            Some(e.to_string())
        }
    };

    PlayerOutcome {
        discord_id: discord_id.to_string(),
        player_id: player_id.to_string(),
        result,
        record_error,
    }
}

/// Aggregate of one deployment
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub gift_code: String,
    /// Ordered by player ID
    pub outcomes: Vec<PlayerOutcome>,
}

impl DeploymentReport {
    fn count(&self, status: RedemptionStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status() == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(RedemptionStatus::Success)
    }

    pub fn already_claimed(&self) -> usize {
        self.count(RedemptionStatus::AlreadyClaimed)
    }

    pub fn failed(&self) -> usize {
        self.count(RedemptionStatus::Failed)
    }

    pub fn unrecorded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.record_error.is_some())
            .count()
    }

    pub fn summary(&self) -> String {
        let mut message = format!(
            "✅ Gift code `{}` deployment completed for {} player(s).\n\
             Success: {} | Already claimed: {} | Failed: {}\n",
            self.gift_code,
            self.outcomes.len(),
            self.succeeded(),
            self.already_claimed(),
            self.failed()
        );

        let unrecorded = self.unrecorded();
        if unrecorded > 0 {
            message.push_str(&format!(
                "⚠️ {} attempt(s) could not be recorded and need manual reconciliation.\n",
                unrecorded
            ));
        }

        let details: Vec<String> = self
            .outcomes
            .iter()
            .filter(|o| o.status() != RedemptionStatus::Success || o.record_error.is_some())
            .map(PlayerOutcome::describe)
            .collect();
        if !details.is_empty() {
            message.push('\n');
            message.push_str(&details.join("\n"));
        }

        message
    }
}

/// Redeems one code across the whole fleet
pub struct Deployer {
    client: Arc<GiftCodeClient>,
    store: SharedStore,
    concurrency: usize,
}

impl Deployer {
    pub fn new(client: Arc<GiftCodeClient>, store: SharedStore, concurrency: usize) -> Self {
        Self {
            client,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Redeem `gift_code` for every Discord ID -> player ID entry
    pub async fn deploy(
        &self,
        gift_code: &str,
        players: HashMap<String, String>,
    ) -> DeploymentReport {
        info!(
            "Deploying gift code {} to {} players ({} at a time)",
            gift_code,
            players.len(),
            self.concurrency
        );

        let mut outcomes: Vec<PlayerOutcome> = stream::iter(players)
            .map(|(discord_id, player_id)| {
                let client = self.client.clone();
                let store = self.store.clone();
                async move {
                    redeem_and_record(&client, &store, &discord_id, &player_id, gift_code).await
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.sort_by(|a, b| a.player_id.cmp(&b.player_id));

        let report = DeploymentReport {
            gift_code: gift_code.to_string(),
            outcomes,
        };
        info!(
            "Gift code {} deployed: {} succeeded, {} already claimed, {} failed, {} unrecorded",
            gift_code,
            report.succeeded(),
            report.already_claimed(),
            report.failed(),
            report.unrecorded()
        );
        report
    }

    /// Deploy to every stored player and post one summary to `channel_id`
    pub async fn deploy_to_all(
        &self,
        gift_code: &str,
        messenger: &dyn Messenger,
        channel_id: &str,
    ) -> Result<DeploymentReport> {
        let players = self.store.player_map().await?;
        let report = self.deploy(gift_code, players).await;
        messenger.send(channel_id, &report.summary()).await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{JsonStore, Store};
    use crate::test_utils::{FailingRecordStore, RecordingMessenger};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::{Duration, Instant};
    use wiremock::{matchers, Mock, MockServer, Request, Respond, ResponseTemplate};

    const SLOW_RESPONSE: Duration = Duration::from_millis(200);

    /// Answers every redemption successfully after a delay, noting when each request arrived
    struct SlowRedeem {
        arrivals: Arc<Mutex<Vec<Instant>>>,
    }

    impl Respond for SlowRedeem {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            self.arrivals.lock().push(Instant::now());
            ResponseTemplate::new(200)
                .set_body_json(json!({ "err_code": 20000, "msg": "SUCCESS" }))
                .set_delay(SLOW_RESPONSE)
        }
    }

    /// Deploy to `count` players against a slow API and return the most
    /// redemption requests seen in flight together
    async fn peak_in_flight(concurrency: usize, count: usize) -> usize {
        let server = MockServer::start().await;
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "err_code": 20000, "msg": "success" })),
            )
            .mount(&server)
            .await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/gift_code"))
            .respond_with(SlowRedeem {
                arrivals: arrivals.clone(),
            })
            .mount(&server)
            .await;

        let store: SharedStore = Arc::new(JsonStore::in_memory());
        let deployer = Deployer::new(client_for(&server), store, concurrency);
        let players: HashMap<String, String> = (1..=count)
            .map(|i| (format!("d{}", i), format!("2000{:02}", i)))
            .collect();

        let report = deployer.deploy("WOS2024", players).await;
        assert_eq!(report.succeeded(), count);

        // A request still counts as in flight until its delayed response lands
        let window = SLOW_RESPONSE - Duration::from_millis(50);
        let arrivals = arrivals.lock().clone();
        assert_eq!(arrivals.len(), count);
        arrivals
            .iter()
            .map(|start| {
                arrivals
                    .iter()
                    .filter(|other| **other >= *start && other.duration_since(*start) < window)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    async fn mock_api() -> MockServer {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .and(matchers::body_string_contains("fid=100004"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "err_code": 40004, "msg": "role not exist." })),
            )
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "err_code": 20000, "msg": "success" })),
            )
            .mount(&server)
            .await;

        for (fid, response) in [
            ("100001", ResponseTemplate::new(200).set_body_json(json!({ "err_code": 20000, "msg": "SUCCESS" }))),
            ("100002", ResponseTemplate::new(200).set_body_json(json!({ "err_code": 40008, "msg": "RECEIVED." }))),
            ("100003", ResponseTemplate::new(500).set_body_string("internal error")),
        ] {
            Mock::given(matchers::method("POST"))
                .and(matchers::path("/gift_code"))
                .and(matchers::body_string_contains(format!("fid={}", fid)))
                .respond_with(response)
                .mount(&server)
                .await;
        }

        server
    }

    fn players() -> HashMap<String, String> {
        (1..=4)
            .map(|i| (format!("d{}", i), format!("10000{}", i)))
            .collect()
    }

    fn client_for(server: &MockServer) -> Arc<GiftCodeClient> {
        Arc::new(GiftCodeClient::new(&server.uri(), "s3cret", Duration::from_secs(2)).unwrap())
    }

    #[tokio::test]
    async fn test_one_audit_row_per_player() {
        let server = mock_api().await;
        let store: SharedStore = Arc::new(JsonStore::in_memory());
        let deployer = Deployer::new(client_for(&server), store.clone(), 2);

        let report = deployer.deploy("WOS2024", players()).await;

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.already_claimed(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.unrecorded(), 0);
        assert!(matches!(
            report.outcomes[2].result,
            AttemptResult::TransportFailed(_)
        ));
        assert!(!report.outcomes[2].describe().contains("500"));
        assert!(matches!(
            report.outcomes[3].result,
            AttemptResult::ValidationFailed(_)
        ));

        let rows = store.list_redemptions(None, 0, 100).await.unwrap();
        assert_eq!(rows.len(), 4);
        let claimed = rows.iter().find(|r| r.player_id == "100002").unwrap();
        assert_eq!(claimed.status, RedemptionStatus::AlreadyClaimed);
    }

    #[tokio::test]
    async fn test_pool_width_bounds_requests_in_flight() {
        let peak = peak_in_flight(2, 6).await;
        assert!(peak <= 2, "{} redemptions were in flight at once", peak);
    }

    #[tokio::test]
    async fn test_zero_width_is_clamped_to_one() {
        let store: SharedStore = Arc::new(JsonStore::in_memory());
        let server = MockServer::start().await;
        assert_eq!(Deployer::new(client_for(&server), store, 0).concurrency, 1);

        let peak = peak_in_flight(0, 3).await;
        assert_eq!(peak, 1);
    }

    #[tokio::test]
    async fn test_unrecorded_redemptions_are_reported() {
        let server = mock_api().await;
        let store: SharedStore = Arc::new(FailingRecordStore::new());
        let deployer = Deployer::new(client_for(&server), store, 3);

        let report = deployer.deploy("WOS2024", players()).await;

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.unrecorded(), 4);
        let redeemed = report
            .outcomes
            .iter()
            .find(|o| o.player_id == "100001")
            .unwrap();
        assert!(redeemed.redeemed_but_unrecorded());
        assert!(report.summary().contains("redeemed for Player ID 100001 but failed to record"));
    }

    #[tokio::test]
    async fn test_deploy_to_all_sends_one_summary() {
        let server = mock_api().await;
        let store: SharedStore = Arc::new(JsonStore::in_memory());
        for (discord_id, player_id) in players() {
            store.upsert_player(&discord_id, &player_id).await.unwrap();
        }
        let messenger = RecordingMessenger::new();
        let deployer = Deployer::new(client_for(&server), store, 5);

        let report = deployer
            .deploy_to_all("WOS2024", &messenger, "chan")
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 4);
        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "chan");
        assert!(sent[0].1.contains("Success: 1 | Already claimed: 1 | Failed: 2"));
    }
}
