pub mod client;
pub mod deploy;
pub mod signing;

pub use client::{GiftCodeClient, PlayerProfile, RedeemOutcome};
pub use deploy::{redeem_and_record, AttemptResult, DeploymentReport, Deployer, PlayerOutcome};
pub use signing::{canonical_string, sign};
