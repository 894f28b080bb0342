pub mod database;
pub mod greetings;
pub mod store;

pub use database::BotDatabase;
pub use greetings::{create_shared_greeting_tracker, GreetingTracker, SharedGreetingTracker};
pub use store::{create_shared_store, JsonStore, SharedStore, Store};
