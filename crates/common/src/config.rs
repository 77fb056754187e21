use crate::{Error, Result};

const DEFAULT_FUTURES_URL: &str = "https://fapi.binance.com";

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    /// Chats that receive alert messages.
    pub telegram_chat_ids: Vec<i64>,
    /// Users allowed to issue bot commands. Defaults to the chat ids.
    pub telegram_allowed_user_ids: Vec<i64>,

    // Market data
    pub binance_futures_url: String,

    // Monitoring
    pub conditions_path: String,
    pub auto_start: bool,
    pub cycle_interval_secs: u64,
    pub alert_cooldown_secs: u64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_chat_ids = parse_ids("TELEGRAM_CHAT_IDS", &required_env("TELEGRAM_CHAT_IDS")?)?;
        let telegram_allowed_user_ids = match optional_env("TELEGRAM_ALLOWED_USER_IDS") {
            Some(raw) => parse_ids("TELEGRAM_ALLOWED_USER_IDS", &raw)?,
            None => telegram_chat_ids.clone(),
        };

        let auto_start = match optional_env("AUTO_START") {
            Some(raw) => parse_bool("AUTO_START", &raw)?,
            None => true,
        };

        Ok(Config {
            telegram_token: required_env("TELEGRAM_TOKEN")?,
            telegram_chat_ids,
            telegram_allowed_user_ids,
            binance_futures_url: optional_env("BINANCE_FUTURES_URL")
                .unwrap_or_else(|| DEFAULT_FUTURES_URL.to_string()),
            conditions_path: optional_env("CONDITIONS_PATH")
                .unwrap_or_else(|| "config/conditions.toml".to_string()),
            auto_start,
            cycle_interval_secs: parse_secs("CYCLE_INTERVAL_SECS", 30)?,
            alert_cooldown_secs: parse_secs("ALERT_COOLDOWN_SECS", 300)?,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!("required environment variable '{key}' is not set. Check your .env file."))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_ids(key: &str, raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("{key} contains non-numeric ID: '{s}'")))
        })
        .collect()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key} must be a boolean, got '{other}'"))),
    }
}

fn parse_secs(key: &str, default: u64) -> Result<u64> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{key} must be a whole number of seconds, got '{raw}'"))),
        None => Ok(default),
    }
}
