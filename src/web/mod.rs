//! Small HTTP server running alongside the bot: health checks, the OAuth2
//! redirect target and a tail of recent log lines.

mod server;

pub use server::{invite_url, router, serve, start_web_server, WebState};
