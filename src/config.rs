use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, ensure};
use chrono::FixedOffset;
use serde::Deserialize;
use serde_yaml::Deserializer;

use crate::sources::guardian;
use crate::sports::{SportCatalog, SportProfile};

const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub openai_api_key: String,
    #[serde(default = "default_model")]
    pub model: String,

    pub guardian_api_key: Option<String>,
    #[serde(default = "default_guardian_endpoint")]
    pub guardian_endpoint: String,
    #[serde(default = "default_guardian_section")]
    pub guardian_section: Option<String>,
    pub region_terms: Option<String>,
    #[serde(default = "default_page_size")]
    pub search_page_size: u32,

    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_sport_attempts")]
    pub sport_attempts: usize,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_ai_timeout")]
    pub ai_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_blocked_hosts")]
    pub blocked_image_hosts: Vec<String>,

    pub discord_webhook_url: Option<String>,
    pub discord_bot_token: Option<String>,
    pub discord_channel_id: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_ids: Option<Vec<String>>,
    #[serde(default)]
    pub mention_everyone: bool,

    /// Replaces the built-in sport table when present.
    pub sports: Option<Vec<SportProfile>>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_guardian_endpoint() -> String {
    guardian::DEFAULT_ENDPOINT.to_string()
}
fn default_guardian_section() -> Option<String> {
    Some("sport".to_string())
}
fn default_page_size() -> u32 {
    20
}
fn default_timezone() -> String {
    "+09:00".to_string()
}
fn default_window_days() -> i64 {
    2
}
fn default_sport_attempts() -> usize {
    1
}
fn default_http_timeout() -> u64 {
    10
}
fn default_ai_timeout() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    3
}
fn default_blocked_hosts() -> Vec<String> {
    vec![
        "doubleclick.net".to_string(),
        "feeds.feedburner.com".to_string(),
        "pixel.wp.com".to_string(),
    ]
}

pub struct EnsureOutcome {
    pub path: PathBuf,
    pub created: bool,
}

const TEMPLATE: &str = r##"# sportsfeed config (YAML)
# Only openai_api_key is required; everything else has a default or is optional.

openai_api_key: "<your OpenAI API key>"
model: "gpt-4o-mini"

# Primary story search. Without a key the bot goes straight to RSS feeds.
guardian_api_key: "<your Guardian open platform key>"
# region_terms: "Japan OR Asia"

# Stories older than window_days (in this UTC offset) are ignored.
timezone: "+09:00"
window_days: 2

# How many weighted-random sports to try per cycle when --sport is not given.
sport_attempts: 2

# Where to post. The first configured option wins:
# 1) a Discord webhook
discord_webhook_url: "https://discord.com/api/webhooks/<id>/<token>"
# 2) a Discord bot token + channel
# discord_bot_token: "<bot token>"
# discord_channel_id: "<channel id>"
# 3) a Telegram bot + chats
# telegram_bot_token: "<bot token>"
# telegram_chat_ids:
#   - "-1001234567890"
mention_everyone: false

# Optional: replace the built-in sport table.
# sports:
#   - sport: soccer
#     query: "football OR soccer"
#     feeds: ["https://feeds.bbci.co.uk/sport/football/rss.xml"]
#     tags: ["#Football", "#GameDay"]
#     weight: 5
"##;

impl Config {
    /// Make sure a config file exists, writing the template on first run.
    pub fn ensure_user_config(path_override: Option<&Path>) -> Result<EnsureOutcome> {
        if let Some(path) = path_override {
            ensure!(path.exists(), "Config file {} does not exist", path.display());
            return Ok(EnsureOutcome {
                path: path.to_path_buf(),
                created: false,
            });
        }

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);
        if let Some(path) = xdg_dirs.find_config_file("config.yaml") {
            return Ok(EnsureOutcome {
                path,
                created: false,
            });
        }

        let config_path = xdg_dirs
            .place_config_file("config.yaml")
            .context("Cannot create configuration directory")?;
        let mut config_file = File::create(&config_path)
            .with_context(|| format!("Failed to create {}", config_path.display()))?;
        config_file.write_all(TEMPLATE.as_bytes())?;

        Ok(EnsureOutcome {
            path: config_path,
            created: true,
        })
    }

    pub fn load(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Config::from_yaml_str(&raw).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Config> {
        let deserialized = Deserializer::from_str(raw);
        let config: Config = serde_path_to_error::deserialize(deserialized)
            .map_err(|e| anyhow!("Invalid YAML at `{}`: {}", e.path(), e.inner()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.timezone()?;
        ensure!(self.window_days >= 1, "window_days must be at least 1");
        ensure!(self.sport_attempts >= 1, "sport_attempts must be at least 1");
        ensure!(self.http_timeout_secs > 0, "http_timeout_secs must be positive");
        ensure!(self.ai_timeout_secs > 0, "ai_timeout_secs must be positive");
        if let Some(sports) = &self.sports {
            ensure!(!sports.is_empty(), "sports is present but empty");
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<FixedOffset> {
        self.timezone
            .trim()
            .parse::<FixedOffset>()
            .map_err(|e| anyhow!("timezone {:?} is not a UTC offset like +09:00: {e}", self.timezone))
    }

    pub fn catalog(&self) -> SportCatalog {
        match &self.sports {
            Some(profiles) => SportCatalog::new(profiles.clone()),
            None => SportCatalog::default(),
        }
    }
}
