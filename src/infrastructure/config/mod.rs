//! Configuration management

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::application::commands::BuiltinCommand;
use crate::application::errors::ConfigError;

/// Twitch token endpoint used when none is configured
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";
/// Twitch IRC over secure WebSocket
pub const DEFAULT_IRC_URL: &str = "wss://irc-ws.chat.twitch.tv:443";
pub const DEFAULT_STORE_PATH: &str = "db.json";

/// Raw configuration as read from `config.yaml` and the environment
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TwitchConfig {
    pub token_endpoint: Option<String>,
    pub username: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorization_code: Option<String>,
    pub channel: Option<String>,
    pub irc_url: Option<String>,
    /// Absent means no timeout on token requests
    pub request_timeout_secs: Option<u64>,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            token_endpoint: Some(DEFAULT_TOKEN_ENDPOINT.to_string()),
            username: None,
            client_id: None,
            client_secret: None,
            authorization_code: None,
            channel: None,
            irc_url: None,
            request_timeout_secs: None,
        }
    }
}

impl fmt::Debug for TwitchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitchConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("authorization_code", &self.authorization_code.as_ref().map(|_| "[REDACTED]"))
            .field("channel", &self.channel)
            .field("irc_url", &self.irc_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Built-in commands to register; absent means all of them
    pub enabled: Option<Vec<String>>,
}

/// Validated bot settings. Every field is non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub token_endpoint: Url,
    pub username: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorization_code: String,
    pub channel: String,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authorization_code", &"[REDACTED]")
            .field("channel", &self.channel)
            .finish()
    }
}

/// Environment variables that override `twitch.*` fields
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("BOT_TOKEN_ENDPOINT", "token_endpoint"),
    ("BOT_USERNAME", "username"),
    ("BOT_CLIENT_ID", "client_id"),
    ("BOT_CLIENT_SECRET", "client_secret"),
    ("BOT_AUTHORIZATION_TOKEN", "authorization_code"),
    ("BOT_CHANNEL", "channel"),
];

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Load the file if it exists, otherwise start from defaults, then
    /// apply environment overrides
    pub fn load_with_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::info!("No config file at {}, using environment only", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override `twitch.*` fields from `lookup` (normally the process env)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, field) in ENV_OVERRIDES {
            let Some(value) = lookup(var) else { continue };
            let slot = match *field {
                "token_endpoint" => &mut self.twitch.token_endpoint,
                "username" => &mut self.twitch.username,
                "client_id" => &mut self.twitch.client_id,
                "client_secret" => &mut self.twitch.client_secret,
                "authorization_code" => &mut self.twitch.authorization_code,
                "channel" => &mut self.twitch.channel,
                _ => continue,
            };
            *slot = Some(value);
        }
    }

    /// Check every required field once. Nothing touches the network before this passes.
    pub fn validate(&self) -> Result<BotConfig, ConfigError> {
        let t = &self.twitch;
        let endpoint = required(&t.token_endpoint, "twitch.token_endpoint")?;
        let token_endpoint = Url::parse(&endpoint)
            .map_err(|e| ConfigError::InvalidValue("twitch.token_endpoint".to_string(), e.to_string()))?;
        if !matches!(token_endpoint.scheme(), "http" | "https") || token_endpoint.host_str().is_none() {
            return Err(ConfigError::InvalidValue(
                "twitch.token_endpoint".to_string(),
                format!("{} is not an http(s) URL", endpoint),
            ));
        }

        let bot = BotConfig {
            token_endpoint,
            username: required(&t.username, "twitch.username")?,
            client_id: required(&t.client_id, "twitch.client_id")?,
            client_secret: required(&t.client_secret, "twitch.client_secret")?,
            authorization_code: required(&t.authorization_code, "twitch.authorization_code")?,
            channel: required(&t.channel, "twitch.channel")?,
        };

        self.enabled_commands()?;
        let irc_url = Url::parse(self.irc_url())
            .map_err(|e| ConfigError::InvalidValue("twitch.irc_url".to_string(), e.to_string()))?;
        if !matches!(irc_url.scheme(), "ws" | "wss") || irc_url.host_str().is_none() {
            return Err(ConfigError::InvalidValue(
                "twitch.irc_url".to_string(),
                format!("{} is not a ws(s) URL", irc_url),
            ));
        }
        if irc_url.scheme() == "ws" {
            tracing::warn!("twitch.irc_url is not encrypted; the OAuth token will be sent in cleartext");
        }

        Ok(bot)
    }

    /// Built-in commands to register at startup
    pub fn enabled_commands(&self) -> Result<Vec<BuiltinCommand>, ConfigError> {
        match &self.commands.enabled {
            None => Ok(BuiltinCommand::ALL.to_vec()),
            Some(names) => names
                .iter()
                .map(|name| {
                    BuiltinCommand::from_name(name).ok_or_else(|| {
                        ConfigError::InvalidValue("commands.enabled".to_string(), format!("unknown command {:?}", name))
                    })
                })
                .collect(),
        }
    }

    pub fn irc_url(&self) -> &str {
        self.twitch.irc_url.as_deref().unwrap_or(DEFAULT_IRC_URL)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.twitch.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn store_path(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    /// A commented starting point for `config.yaml`
    pub fn template() -> Self {
        let mut config = Self::default();
        config.twitch.username = Some("my_bot".to_string());
        config.twitch.client_id = Some("your-client-id".to_string());
        config.twitch.client_secret = Some("your-client-secret".to_string());
        config.twitch.authorization_code = Some("your-authorization-code".to_string());
        config.twitch.channel = Some("my_channel".to_string());
        config.twitch.irc_url = Some(DEFAULT_IRC_URL.to_string());
        config.storage.path = Some(PathBuf::from(DEFAULT_STORE_PATH));
        config.commands.enabled = Some(BuiltinCommand::ALL.iter().map(|c| c.name().to_string()).collect());
        config
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingField(field.to_string())),
    }
}
