use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::signing::{sign, SIGN_FIELD};
use crate::config::GiftCodeSettings;
use crate::error::{BotError, Result};
use crate::models::RedemptionStatus;

const SUCCESS_CODE: i64 = 20000;
const CODE_NOT_FOUND: i64 = 40014;
const CODE_EXPIRED: i64 = 40007;
const CODE_ALREADY_CLAIMED: i64 = 40008;

/// Classified result of a redemption call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Success,
    NotFound,
    Expired,
    AlreadyClaimed,
    /// An `err_code` we have no mapping for, with the API's own message
    Unknown { code: i64, message: String },
}

impl RedeemOutcome {
    pub fn from_response(err_code: i64, msg: &str) -> Self {
        match err_code {
            SUCCESS_CODE => RedeemOutcome::Success,
            CODE_NOT_FOUND => RedeemOutcome::NotFound,
            CODE_EXPIRED => RedeemOutcome::Expired,
            CODE_ALREADY_CLAIMED => RedeemOutcome::AlreadyClaimed,
            code => RedeemOutcome::Unknown {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// Status written to the audit log
    pub fn status(&self) -> RedemptionStatus {
        match self {
            RedeemOutcome::Success => RedemptionStatus::Success,
            RedeemOutcome::AlreadyClaimed => RedemptionStatus::AlreadyClaimed,
            _ => RedemptionStatus::Failed,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RedeemOutcome::Success => "Gift code redeemed successfully".to_string(),
            RedeemOutcome::NotFound => "Gift Code not found".to_string(),
            RedeemOutcome::Expired => "Expired, unable to claim".to_string(),
            RedeemOutcome::AlreadyClaimed => "Gift code already claimed".to_string(),
            RedeemOutcome::Unknown { message, .. } => format!("Unknown error: {}", message),
        }
    }
}

/// Player details returned by a successful validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerProfile {
    pub player_id: String,
    pub nickname: Option<String>,
}

/// Decoded `{err_code, msg, data}` envelope
#[derive(Debug)]
struct ApiResponse {
    err_code: Option<i64>,
    msg: String,
    data: Value,
}

impl ApiResponse {
    fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body).map_err(|e| BotError::GiftCodeResponse {
            message: format!("response is not JSON: {}", e),
        })?;

        if !value.is_object() {
            return Err(BotError::GiftCodeResponse {
                message: "response is not a JSON object".to_string(),
            });
        }

        let err_code = value
            .get("err_code")
            .and_then(|code| code.as_i64().or_else(|| code.as_f64().map(|f| f as i64)));
        let msg = value
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = value.get("data").cloned().unwrap_or(Value::Null);

        Ok(Self {
            err_code,
            msg,
            data,
        })
    }
}

/// Client for the game's gift code API
#[derive(Debug, Clone)]
pub struct GiftCodeClient {
    http: reqwest::Client,
    base_url: String,
    salt: String,
}

impl GiftCodeClient {
    pub fn new(base_url: &str, salt: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            salt: salt.to_string(),
        })
    }

    pub fn from_settings(settings: &GiftCodeSettings) -> Result<Self> {
        Self::new(
            &settings.api_endpoint,
            &settings.salt,
            Duration::from_secs(settings.api_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a signed form and decode the JSON envelope
    async fn post(&self, endpoint: &str, mut params: Vec<(&str, String)>) -> Result<ApiResponse> {
        let time = chrono::Utc::now().timestamp_millis().to_string();
        params.push(("time", time));

        let signature = sign(params.iter().map(|(k, v)| (*k, v.as_str())), &self.salt);
        params.push((SIGN_FIELD, signature));

        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self.http.post(&url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        ApiResponse::parse(&body).map_err(|e| {
            warn!("Unexpected response from {} (HTTP {}): {}", url, status, e);
            e
        })
    }

    /// Check that a player exists upstream. Must pass before redeeming for them.
    pub async fn validate_player(&self, player_id: &str) -> Result<PlayerProfile> {
        let response = self
            .post("/player", vec![("fid", player_id.to_string())])
            .await?;

        // msg only decides when the envelope has no err_code
        let accepted = match response.err_code {
            Some(code) => code == SUCCESS_CODE,
            None => response.msg.eq_ignore_ascii_case("success"),
        };

        if accepted {
            let nickname = response
                .data
                .get("nickname")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Ok(PlayerProfile {
                player_id: player_id.to_string(),
                nickname,
            });
        }

        if response.err_code.is_none() && response.msg.is_empty() {
            return Err(BotError::GiftCodeResponse {
                message: "player response carries neither err_code nor msg".to_string(),
            });
        }

        let message = if response.msg.is_empty() {
            format!("err_code {}", response.err_code.unwrap_or_default())
        } else {
            response.msg
        };
        Err(BotError::PlayerValidation {
            player_id: player_id.to_string(),
            message,
        })
    }

    /// Redeem a code without validating the player first
    pub async fn redeem_code(&self, player_id: &str, code: &str) -> Result<RedeemOutcome> {
        let response = self
            .post(
                "/gift_code",
                vec![("fid", player_id.to_string()), ("cdk", code.to_string())],
            )
            .await?;

        let err_code = response.err_code.ok_or_else(|| BotError::GiftCodeResponse {
            message: "missing numeric err_code".to_string(),
        })?;

        Ok(RedeemOutcome::from_response(err_code, &response.msg))
    }

    /// Validate the player, then redeem. A failed validation never reaches the redemption endpoint.
    pub async fn redeem_for_player(&self, player_id: &str, code: &str) -> Result<RedeemOutcome> {
        self.validate_player(player_id).await?;
        self.redeem_code(player_id, code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GiftCodeClient {
        GiftCodeClient::new(&server.uri(), "s3cret", Duration::from_secs(2)).unwrap()
    }

    async fn mount_player_ok(server: &MockServer) {
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "err_code": 20000,
                "msg": "success",
                "data": { "fid": 100045, "nickname": "Keeper" }
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(RedeemOutcome::from_response(20000, ""), RedeemOutcome::Success);
        assert_eq!(RedeemOutcome::from_response(40014, ""), RedeemOutcome::NotFound);
        assert_eq!(RedeemOutcome::from_response(40007, ""), RedeemOutcome::Expired);
        assert_eq!(
            RedeemOutcome::from_response(40008, "already claimed").status(),
            RedemptionStatus::AlreadyClaimed
        );

        let unknown = RedeemOutcome::from_response(40004, "TIMEOUT RETRY.");
        assert_eq!(unknown.status(), RedemptionStatus::Failed);
        assert_eq!(unknown.message(), "Unknown error: TIMEOUT RETRY.");
        assert_eq!(RedeemOutcome::Expired.message(), "Expired, unable to claim");
    }

    #[tokio::test]
    async fn test_validate_player_sends_signed_form() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .and(matchers::header(
                "content-type",
                "application/x-www-form-urlencoded",
            ))
            .and(matchers::body_string_contains("fid=100045"))
            .and(matchers::body_string_contains("time="))
            .and(matchers::body_string_contains("sign="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "err_code": 20000,
                "msg": "success",
                "data": { "nickname": "Keeper" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server).validate_player("100045").await.unwrap();
        assert_eq!(profile.nickname.as_deref(), Some("Keeper"));
    }

    #[tokio::test]
    async fn test_already_claimed_is_distinct() {
        let server = MockServer::start().await;
        mount_player_ok(&server).await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/gift_code"))
            .and(matchers::body_string_contains("cdk=WOS2024"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "err_code": 40008, "msg": "already claimed" })),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .redeem_for_player("100045", "WOS2024")
            .await
            .unwrap();
        assert_eq!(outcome, RedeemOutcome::AlreadyClaimed);
        assert_eq!(outcome.status(), RedemptionStatus::AlreadyClaimed);
    }

    #[tokio::test]
    async fn test_failed_validation_skips_redemption() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "err_code": 40004, "msg": "role not exist." })),
            )
            .mount(&server)
            .await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/gift_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "err_code": 20000 })))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .redeem_for_player("999", "WOS2024")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::PlayerValidation { .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_error_code_outranks_success_msg() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "err_code": 40004, "msg": "success" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).validate_player("100045").await.unwrap_err();
        assert!(matches!(err, BotError::PlayerValidation { .. }));
    }

    #[tokio::test]
    async fn test_success_msg_accepted_without_error_code() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "msg": "Success" })))
            .mount(&server)
            .await;

        let profile = client_for(&server).validate_player("100045").await.unwrap();
        assert_eq!(profile.player_id, "100045");
        assert!(profile.nickname.is_none());
    }

    #[tokio::test]
    async fn test_malformed_response_is_transport_error() {
        let server = MockServer::start().await;
        mount_player_ok(&server).await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/gift_code"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .redeem_for_player("100045", "WOS2024")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::GiftCodeResponse { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_missing_err_code_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/gift_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "msg": "ok" })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .redeem_code("100045", "WOS2024")
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/player"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "err_code": 20000, "msg": "success" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client =
            GiftCodeClient::new(&server.uri(), "s3cret", Duration::from_millis(50)).unwrap();
        let err = client.validate_player("100045").await.unwrap_err();
        assert!(matches!(err, BotError::GiftCodeTimeout));
    }
}
