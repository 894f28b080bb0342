//! Gift code discovery.
//!
//! Every configured site is fetched concurrently under one deadline. Codes
//! are diffed against the set of tokens already announced; new ones go out in
//! a single notification and are only marked as seen once it was delivered.

pub mod extract;

pub use extract::extract_codes;

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{BotError, Result};
use crate::messaging::SharedMessenger;
use crate::models::{GiftCode, ScrapeResult, ScrapeSite};

/// What one scrape cycle produced
#[derive(Debug, Clone)]
pub struct ScrapeCycle {
    pub results: Vec<ScrapeResult>,
    pub new_codes: Vec<GiftCode>,
    /// True when the new codes were announced and absorbed into the seen-set
    pub notified: bool,
}

pub struct Scraper {
    http: reqwest::Client,
    sites: Vec<ScrapeSite>,
    deadline: Duration,
    messenger: SharedMessenger,
    notification_channel: String,
    /// Tokens already announced. Only grows.
    seen: Mutex<HashSet<String>>,
    /// Serializes cycles so a manual run and the timer never announce the same code twice
    cycle_lock: tokio::sync::Mutex<()>,
}

impl Scraper {
    pub fn new(
        sites: Vec<ScrapeSite>,
        deadline: Duration,
        messenger: SharedMessenger,
        notification_channel: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(deadline)
            .user_agent(concat!("keeper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            sites,
            deadline,
            messenger,
            notification_channel: notification_channel.to_string(),
            seen: Mutex::new(HashSet::new()),
            cycle_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn from_settings(settings: &Settings, messenger: SharedMessenger) -> Result<Self> {
        Self::new(
            settings.scrape.sites.clone(),
            Duration::from_secs(settings.scrape.deadline_secs),
            messenger,
            &settings.discord.notification_channel_id,
        )
    }

    pub fn sites(&self) -> &[ScrapeSite] {
        &self.sites
    }

    pub fn seen_count(&self) -> usize {
        self.seen.lock().len()
    }

    async fn fetch_codes(&self, site: &ScrapeSite) -> Result<Vec<GiftCode>> {
        let scrape_error = |message: String| BotError::Scrape {
            site: site.name.clone(),
            message,
        };

        let response = self
            .http
            .get(&site.url)
            .send()
            .await
            .map_err(|e| scrape_error(format!("error making request: {}", e)))?;
        let response = response
            .error_for_status()
            .map_err(|e| scrape_error(format!("bad status: {}", e)))?;
        let body = response
            .text()
            .await
            .map_err(|e| scrape_error(format!("error reading body: {}", e)))?;

        extract_codes(&body, site)
    }

    async fn scrape_site(&self, site: &ScrapeSite, deadline: Instant) -> ScrapeResult {
        let outcome = match tokio::time::timeout_at(deadline, self.fetch_codes(site)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(BotError::Scrape {
                site: site.name.clone(),
                message: "deadline exceeded".to_string(),
            }),
        };

        match outcome {
            Ok(codes) => {
                debug!("Found {} codes on {}", codes.len(), site.name);
                ScrapeResult {
                    site_name: site.name.clone(),
                    codes,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Error scraping site {}: {}", site.name, e);
                ScrapeResult {
                    site_name: site.name.clone(),
                    codes: vec![],
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Fetch every site concurrently. Results come back in site order.
    pub async fn scrape_all(&self) -> Vec<ScrapeResult> {
        let deadline = Instant::now() + self.deadline;
        join_all(
            self.sites
                .iter()
                .map(|site| self.scrape_site(site, deadline)),
        )
        .await
    }

    /// Codes from `results` whose token has not been announced yet, first occurrence wins
    pub fn find_new_codes(&self, results: &[ScrapeResult]) -> Vec<GiftCode> {
        let seen = self.seen.lock();
        let mut batch = HashSet::new();

        results
            .iter()
            .flat_map(|r| r.codes.iter())
            .filter(|code| !seen.contains(&code.code) && batch.insert(code.code.clone()))
            .cloned()
            .collect()
    }

    fn mark_seen(&self, codes: &[GiftCode]) {
        let mut seen = self.seen.lock();
        seen.extend(codes.iter().map(|c| c.code.clone()));
    }

    async fn notify_new_codes(&self, codes: &[GiftCode]) -> Result<()> {
        if self.notification_channel.is_empty() {
            return Err(BotError::ConfigValidation {
                message: "no notification channel configured".to_string(),
            });
        }

        self.messenger
            .send(&self.notification_channel, &format_new_codes(codes))
            .await?;

        info!("New gift codes notification sent ({} codes)", codes.len());
        Ok(())
    }

    /// Scrape, diff against the seen-set and announce anything new
    pub async fn run_cycle(&self) -> ScrapeCycle {
        let _cycle = self.cycle_lock.lock().await;

        let results = self.scrape_all().await;
        let new_codes = self.find_new_codes(&results);

        if new_codes.is_empty() {
            info!("No new gift codes found. Skipping notification.");
            return ScrapeCycle {
                results,
                new_codes,
                notified: false,
            };
        }

        info!("New gift codes found, notifying...");
        let notified = match self.notify_new_codes(&new_codes).await {
            Ok(()) => {
                self.mark_seen(&new_codes);
                true
            }
            Err(e) => {
                error!("Error notifying new codes: {}", e);
                false
            }
        };

        ScrapeCycle {
            results,
            new_codes,
            notified,
        }
    }

    /// Run a cycle every `interval` until the shutdown flag turns true
    pub async fn run_periodic(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Periodic scraping every {:?} across {} sites", interval, self.sites.len());

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    let cycle = self.run_cycle().await;
                    info!(
                        "Periodic scraping completed: {} sites, {} new codes",
                        cycle.results.len(),
                        cycle.new_codes.len()
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Stopping periodic scraping");
    }
}

pub fn format_new_codes(codes: &[GiftCode]) -> String {
    let mut message = String::from("🎉 New gift codes found:\n\n");
    for code in codes {
        message.push_str(&format!(
            "**Code:** {}\n**Description:** {}\n**Source:** {}\n\n",
            code.code, code.description, code.source
        ));
    }
    message
}

/// Per-site report for the channel that asked for a scrape
pub fn format_results(results: &[ScrapeResult]) -> String {
    let mut message = String::from("■ Scraping Results ■\n\n");
    let mut total = 0;

    for result in results {
        message.push_str(&format!("» {} »\n", result.site_name));
        match &result.error {
            Some(e) => message.push_str(&format!("   ❌ Error: {}\n", e)),
            None => {
                message.push_str(&format!("   Codes Found: {}\n", result.codes.len()));
                for code in &result.codes {
                    message.push_str(&format!("      - {}: {}\n", code.code, code.description));
                }
                total += result.codes.len();
            }
        }
        message.push('\n');
    }

    message.push_str(&format!("Total Codes Found: {}\n", total));
    message
}
