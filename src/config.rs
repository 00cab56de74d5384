use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::moderation::policy::{ModerationPolicy, UserMatch};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_API_URL: &str = "https://slack.com/api";

const ENV_TOKEN: &str = "SLACK_API_TOKEN";
const ENV_API_URL: &str = "SLACK_API_URL";
const ENV_CHANNEL: &str = "CHANNEL";
const ENV_RESTRICTED_USERS: &str = "RESTRICTED_USERS";
const ENV_MATCH_MODE: &str = "RESTRICTED_USERS_MATCH";

#[derive(Clone)]
pub struct SlackConfig {
    pub api_token: String,
    pub api_url: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("api_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Process configuration. Read once at startup, immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub slack: SlackConfig,
    pub policy: ModerationPolicy,
}

// Loose file layout: everything optional so the environment can fill gaps.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    slack: RawSlack,
    #[serde(default)]
    moderation: RawModeration,
}

#[derive(Debug, Deserialize, Default)]
struct RawSlack {
    api_token: Option<String>,
    api_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawModeration {
    #[serde(default)]
    channels: Vec<String>,
    #[serde(default)]
    restricted_users: Vec<String>,
    match_mode: Option<UserMatch>,
}

/// Split a comma separated env value, dropping blanks.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn missing(env: &str, key: &str) -> Error {
    Error::Configuration(format!(
        "please set the environment variable {} (or `{}` in the config file)",
        env, key
    ))
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `config.toml` is read if
    /// present and the environment alone is enough otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => Some(read_file(path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Some(read_file(default)?)
                } else {
                    None
                }
            }
        };

        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build from file contents and an environment lookup. Environment values
    /// win over the file.
    pub fn from_sources<F>(content: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match content {
            Some(text) => toml::from_str(text).map_err(|e| {
                Error::Configuration(format!("failed to parse config file: {}", e))
            })?,
            None => RawConfig::default(),
        };

        let api_token = env(ENV_TOKEN)
            .or(raw.slack.api_token)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing(ENV_TOKEN, "slack.api_token"))?;

        let api_url = env(ENV_API_URL)
            .or(raw.slack.api_url)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let channels = match env(ENV_CHANNEL) {
            Some(value) => split_list(&value),
            None => raw.moderation.channels,
        };
        if channels.is_empty() {
            return Err(missing(ENV_CHANNEL, "moderation.channels"));
        }

        let restricted_users = match env(ENV_RESTRICTED_USERS) {
            Some(value) => split_list(&value),
            None => raw.moderation.restricted_users,
        };
        if restricted_users.is_empty() {
            return Err(missing(ENV_RESTRICTED_USERS, "moderation.restricted_users"));
        }

        let match_mode = match env(ENV_MATCH_MODE) {
            Some(value) => value.parse::<UserMatch>().map_err(Error::Configuration)?,
            None => raw.moderation.match_mode.unwrap_or_default(),
        };

        Ok(Config {
            slack: SlackConfig { api_token, api_url },
            policy: ModerationPolicy::new(channels, restricted_users, match_mode),
        })
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })
}
