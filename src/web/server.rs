use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::logging::SharedLogTail;

const LOG_LINES: usize = 200;

/// Shared state for web handlers
#[derive(Clone)]
pub struct WebState {
    pub log_tail: SharedLogTail,
}

/// Query parameters Discord appends to the OAuth2 redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/healthz", get(healthz))
        .route("/oauth2/callback", get(oauth_callback))
        .route("/logs", get(recent_logs))
        .with_state(state)
}

/// Bind on all interfaces and serve until `shutdown` turns true
pub async fn start_web_server(
    port: u16,
    state: WebState,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Web server listening on http://{}", addr);
    serve(listener, state, shutdown).await
}

pub async fn serve(
    listener: TcpListener,
    state: WebState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    info!("Web server stopped");
    Ok(())
}

/// OAuth2 URL that adds the bot to a guild
pub fn invite_url(client_id: &str) -> String {
    format!(
        "https://discord.com/oauth2/authorize?client_id={}&scope={}&permissions=274877975552",
        urlencoding::encode(client_id),
        urlencoding::encode("bot applications.commands")
    )
}

async fn banner() -> &'static str {
    "Keeper bot running"
}

async fn healthz() -> &'static str {
    "OK"
}

async fn oauth_callback(Query(params): Query<CallbackParams>) -> &'static str {
    match (&params.code, &params.state) {
        (Some(code), state) => info!(
            "OAuth2 callback received (code length {}, state {:?})",
            code.len(),
            state
        ),
        (None, _) => warn!("OAuth2 callback without a code: {:?}", params),
    }
    "Authorization received. You can close this window."
}

async fn recent_logs(State(state): State<WebState>) -> String {
    state.log_tail.recent(LOG_LINES).join("\n")
}
