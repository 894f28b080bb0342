//! Guild management bot: configuration-driven text commands, gift-code
//! redemption against the game API and scraping of code listing pages.

pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod giftcode;
pub mod logging;
pub mod messages;
pub mod messaging;
pub mod models;
pub mod scrape;
pub mod state;
pub mod web;

#[cfg(test)]
pub mod test_utils;
