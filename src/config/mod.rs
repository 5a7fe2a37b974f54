//! # Configuration Management Module
//!
//! Word-chain settings are read from a single TOML file. Every section has defaults, so
//! a minimal file only needs the keys that differ:
//!
//! ```toml
//! [game]
//! default_turn_seconds = 30
//! turn_second_options = [30, 45, 60]
//! min_players = 2
//! max_players = 10
//!
//! [validator]
//! provider = "dictionary"   # or "llm"
//! cache_ttl_days = 30
//!
//! [validator.llm]
//! vendor = "openai"         # or "anthropic"
//! api_key = "sk-..."
//! model = "gpt-4o-mini"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "wordchain.log"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wordchain::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("Turn length: {}s", config.game.default_turn_seconds);
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::validation::validate_language;

/// Public command prefixes accepted by the chat adapter.
const ALLOWED_PREFIXES: &[&str] = &["^", "!", "+", "$", "/", ">"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_turn_seconds")]
    pub default_turn_seconds: u32,
    /// Turn lengths a party creator may pick from.
    #[serde(default = "default_turn_second_options")]
    pub turn_second_options: Vec<u32>,
    #[serde(default = "default_min_players")]
    pub min_players: usize,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Seconds between countdown refreshes while a turn is running.
    #[serde(default = "default_update_interval")]
    pub timer_update_interval_seconds: u32,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_turn_seconds() -> u32 {
    30
}

fn default_turn_second_options() -> Vec<u32> {
    vec![30, 45, 60]
}

fn default_min_players() -> usize {
    2
}

fn default_max_players() -> usize {
    10
}

fn default_update_interval() -> u32 {
    3
}

fn default_language() -> String {
    "en".to_string()
}

fn default_command_prefix() -> String {
    "^".to_string()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_turn_seconds: default_turn_seconds(),
            turn_second_options: default_turn_second_options(),
            min_players: default_min_players(),
            max_players: default_max_players(),
            timer_update_interval_seconds: default_update_interval(),
            default_language: default_language(),
            command_prefix: default_command_prefix(),
        }
    }
}

impl GameConfig {
    /// Configured prefix, or "^" when the configured one is not in the allowed set.
    pub fn prefix(&self) -> &str {
        if ALLOWED_PREFIXES.contains(&self.command_prefix.as_str()) {
            &self.command_prefix
        } else {
            "^"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorProvider {
    #[default]
    Dictionary,
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmVendor {
    #[default]
    OpenAi,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub provider: ValidatorProvider,
    /// Cached verdicts older than this are revalidated.
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Base URL; `/{language}/{word}` is appended per lookup.
    #[serde(default = "default_dictionary_url")]
    pub dictionary_url: String,
    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_cache_ttl_days() -> u32 {
    30
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_dictionary_url() -> String {
    "https://api.dictionaryapi.dev/api/v2/entries".to_string()
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            provider: ValidatorProvider::default(),
            cache_ttl_days: default_cache_ttl_days(),
            timeout_seconds: default_timeout_seconds(),
            dictionary_url: default_dictionary_url(),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub vendor: LlmVendor,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Override for the vendor's chat endpoint (proxies, compatible servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            vendor: LlmVendor::default(),
            api_key: String::new(),
            model: default_llm_model(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("wordchain.db")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("wordchain.log".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let game = &self.game;
        if game.min_players < 2 {
            return Err(anyhow!("game.min_players must be at least 2"));
        }
        if game.max_players < game.min_players {
            return Err(anyhow!(
                "game.max_players ({}) is below game.min_players ({})",
                game.max_players,
                game.min_players
            ));
        }
        if game.turn_second_options.is_empty() {
            return Err(anyhow!("game.turn_second_options must not be empty"));
        }
        if game.turn_second_options.contains(&0) {
            return Err(anyhow!("game.turn_second_options must be positive"));
        }
        if !game
            .turn_second_options
            .contains(&game.default_turn_seconds)
        {
            return Err(anyhow!(
                "game.default_turn_seconds ({}) is not one of {:?}",
                game.default_turn_seconds,
                game.turn_second_options
            ));
        }
        if game.timer_update_interval_seconds == 0 {
            return Err(anyhow!("game.timer_update_interval_seconds must be positive"));
        }
        validate_language(&game.default_language).map_err(|e| anyhow!("game: {}", e))?;

        let validator = &self.validator;
        if validator.timeout_seconds == 0 {
            return Err(anyhow!("validator.timeout_seconds must be positive"));
        }
        if validator.provider == ValidatorProvider::Llm && validator.llm.api_key.trim().is_empty()
        {
            return Err(anyhow!(
                "validator.provider = \"llm\" requires validator.llm.api_key"
            ));
        }
        Ok(())
    }
}
