use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    pub channels: ChannelsConfig,
    pub translation: TranslationConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub bot_token: String,
    #[serde(default = "default_use_privileged_intents")]
    pub use_privileged_intents: bool,
}

/// The two mirrored endpoints. Side A is translated into side B's language
/// and vice versa; which human language each side speaks is entirely
/// determined by the configured DeepL codes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelsConfig {
    pub side_a: SideChannelConfig,
    pub side_b: SideChannelConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SideChannelConfig {
    /// Discord channel id, as a decimal string.
    pub id: String,
    /// DeepL source language code for text posted on this side (e.g. "JA").
    pub source_lang: String,
    /// DeepL target language code for text mirrored *into* this side
    /// (e.g. "EN-US"; DeepL target codes carry the regional variant).
    pub target_lang: String,
    /// Notice posted as a reply on this side when translating a message
    /// from this side fails.
    #[serde(default = "default_failure_notice")]
    pub failure_notice: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    pub api_key: String,
    #[serde(default = "default_translation_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    /// Name the bot gives its webhooks; also how it finds them again after
    /// a restart.
    #[serde(default = "default_webhook_name")]
    pub webhook_name: String,
    /// Invisible marker appended to mirrored display names so the engine
    /// recognizes its own output. Must never be empty.
    #[serde(default = "default_loop_marker")]
    pub loop_marker: String,
    /// Reaction placed on the original message when mirroring it fails.
    #[serde(default = "default_warning_emoji")]
    pub warning_emoji: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            webhook_name: default_webhook_name(),
            loop_marker: default_loop_marker(),
            warning_emoji: default_warning_emoji(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub min_connections: Option<u32>,
}

impl DatabaseConfig {
    pub fn db_type(&self) -> DbType {
        if self.connection_string().starts_with("sqlite://") {
            DbType::Sqlite
        } else {
            DbType::Postgres
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(ref url) = self.url {
            url.clone()
        } else if let Some(ref file) = self.filename {
            format!("sqlite://{}", file)
        } else {
            String::new()
        }
    }

    pub fn sqlite_path(&self) -> Option<String> {
        if let DbType::Sqlite = self.db_type() {
            let url = self.connection_string();
            Some(url.strip_prefix("sqlite://").unwrap_or(&url).to_string())
        } else {
            None
        }
    }

    pub fn max_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.max_connections,
            DbType::Sqlite => Some(1),
        }
    }

    pub fn min_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.min_connections,
            DbType::Sqlite => Some(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.bot_token.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "auth.bot_token cannot be empty".to_string(),
            ));
        }

        if self.channels.side_a.id.is_empty() || self.channels.side_b.id.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "both channels.side_a.id and channels.side_b.id must be set".to_string(),
            ));
        }

        if self.channels.side_a.id == self.channels.side_b.id {
            return Err(ConfigError::InvalidConfig(
                "channels.side_a.id and channels.side_b.id must differ".to_string(),
            ));
        }

        for (name, side) in [
            ("side_a", &self.channels.side_a),
            ("side_b", &self.channels.side_b),
        ] {
            if side.source_lang.is_empty() || side.target_lang.is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "channels.{name} must set source_lang and target_lang"
                )));
            }
        }

        if self.translation.api_key.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "translation.api_key cannot be empty".to_string(),
            ));
        }

        if self.mirror.loop_marker.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "mirror.loop_marker cannot be empty".to_string(),
            ));
        }

        if self.mirror.webhook_name.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "mirror.webhook_name cannot be empty".to_string(),
            ));
        }

        if self.database.connection_string().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "database connection string cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("TRANSLATOR_BOT_TOKEN") {
            self.auth.bot_token = value;
        }
        if let Ok(value) = std::env::var("TRANSLATOR_DEEPL_API_KEY") {
            self.translation.api_key = value;
        }
    }
}

fn default_use_privileged_intents() -> bool {
    true
}

fn default_failure_notice() -> String {
    "An error occurred during translation. Please try again later.".to_string()
}

fn default_translation_api_url() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}

fn default_webhook_name() -> String {
    "Community Translator Bot".to_string()
}

fn default_loop_marker() -> String {
    "\u{200B}".to_string()
}

fn default_warning_emoji() -> String {
    "\u{26A0}\u{FE0F}".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
