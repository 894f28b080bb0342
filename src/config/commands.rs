use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{BotError, Result};

/// Command tree as written in configs/commands.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandsConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub commands: BTreeMap<String, CommandSpec>,
}

fn default_prefix() -> String {
    "!".to_string()
}

/// One command (or subcommand) entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandSpec {
    pub description: String,
    pub usage: String,
    /// Duration string such as "10s" or "1m30s"; empty means no cooldown
    pub cooldown: String,
    pub hidden: bool,
    /// Name of the registered handler this command runs
    pub handler: String,
    pub subcommands: BTreeMap<String, CommandSpec>,
}

impl CommandsConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, path: &str) -> Result<Self> {
        let config: CommandsConfig =
            serde_json::from_str(content).map_err(|e| BotError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks: non-empty prefix, one level of nesting, unique names
    /// ignoring case, and parsable cooldowns.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(BotError::ConfigValidation {
                message: "command prefix must not be empty".to_string(),
            });
        }

        check_unique_names(self.commands.keys(), "command")?;

        for (name, spec) in &self.commands {
            parse_cooldown(&spec.cooldown)?;
            check_unique_names(spec.subcommands.keys(), &format!("subcommand of '{}'", name))?;

            for (sub_name, sub) in &spec.subcommands {
                if !sub.subcommands.is_empty() {
                    return Err(BotError::ConfigValidation {
                        message: format!(
                            "'{}.{}' declares subcommands; only one level of nesting is supported",
                            name, sub_name
                        ),
                    });
                }
                parse_cooldown(&sub.cooldown)?;
            }
        }

        Ok(())
    }
}

fn check_unique_names<'a>(names: impl Iterator<Item = &'a String>, scope: &str) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() || normalized.contains(char::is_whitespace) {
            return Err(BotError::ConfigValidation {
                message: format!("invalid {} name '{}'", scope, name),
            });
        }
        if !seen.insert(normalized) {
            return Err(BotError::ConfigValidation {
                message: format!("duplicate {} name '{}' (names are case-insensitive)", scope, name),
            });
        }
    }
    Ok(())
}

/// Parse a cooldown spec. Empty, or any zero duration, means "no cooldown".
pub fn parse_cooldown(spec: &str) -> Result<Option<Duration>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(None);
    }
    let duration = parse_duration(spec)?;
    Ok(if duration.is_zero() { None } else { Some(duration) })
}

/// Parse Go-style durations: one or more `<number><unit>` pairs, e.g. "1h30m", "1.5s", "250ms".
/// A bare "0" is accepted.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = |message: &str| BotError::InvalidDuration {
        value: value.to_string(),
        message: message.to_string(),
    };

    if value == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = value;
    let mut total_nanos = 0f64;

    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let number: f64 = rest[..number_len]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];

        total_nanos += number * nanos_per_unit;
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
