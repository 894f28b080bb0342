pub mod commands;
pub mod settings;

pub use commands::{parse_cooldown, parse_duration, CommandSpec, CommandsConfig};
pub use settings::{
    DiscordSettings, GiftCodeSettings, LoggingSettings, PathSettings, ScrapeSettings,
    ServerSettings, Settings,
};
