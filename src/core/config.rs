//! Runtime configuration
//!
//! Settings come from the process environment (after `.env` is loaded by
//! `main`). They are read once at startup into a [`Config`] which is then
//! passed explicitly to whatever needs it. Fixed values live in the nested
//! modules below.

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;
use url::Url;

use crate::core::error::{AppError, AppResult};

/// Path the Telegram webhook is registered under, relative to the public URL.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Default HTTP port when PORT is not set
pub const DEFAULT_PORT: u16 = 5000;

/// Default SQLite file when DATABASE_PATH is not set
pub const DEFAULT_DATABASE_PATH: &str = "data.db";

/// Database configuration
pub mod database {
    use super::Duration;

    /// Maximum number of pooled SQLite connections
    pub const POOL_MAX_SIZE: u32 = 4;

    /// How long a connection waits on a locked database before failing
    pub const BUSY_TIMEOUT_SECS: u64 = 5;

    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

/// Network configuration for Bot API calls
pub mod network {
    use super::Duration;

    /// Request timeout (in seconds)
    pub const TIMEOUT_SECS: u64 = 30;

    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Export configuration
pub mod export {
    /// File name of the CSV document sent by /export
    pub const FILE_NAME: &str = "wells.csv";
}

/// Process configuration assembled at startup.
#[derive(Debug)]
pub struct Config {
    /// Bot API token (BOT_TOKEN or TELOXIDE_TOKEN)
    pub bot_token: SecretString,
    /// Public base URL the webhook is registered under
    /// (PUBLIC_URL, RENDER_EXTERNAL_URL or WEBHOOK_URL)
    pub public_url: Option<Url>,
    /// HTTP listen port (PORT)
    pub port: u16,
    /// SQLite file path (DATABASE_PATH)
    pub database_path: String,
    /// Idle time after which a pending conversation is dropped
    /// (SESSION_TIMEOUT_SECS; unset or 0 disables expiry)
    pub session_timeout: Option<Duration>,
    /// Insert the sample wells into an empty table on startup (SEED_DEMO_DATA)
    pub seed_demo_data: bool,
    /// Custom Bot API server (BOT_API_URL)
    pub bot_api_url: Option<Url>,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the bot token is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or_else(|| AppError::Config("BOT_TOKEN is not set".to_string()))?;

        let public_url = get("PUBLIC_URL")
            .or_else(|| get("RENDER_EXTERNAL_URL"))
            .or_else(|| get("WEBHOOK_URL"))
            .map(|raw| parse_url("PUBLIC_URL", &raw))
            .transpose()?;

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("PORT must be a port number, got {:?}", raw)))?,
            None => DEFAULT_PORT,
        };

        let session_timeout = match get("SESSION_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .map_err(|_| AppError::Config(format!("SESSION_TIMEOUT_SECS must be a number, got {:?}", raw)))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let bot_api_url = get("BOT_API_URL")
            .map(|raw| parse_url("BOT_API_URL", &raw))
            .transpose()?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            public_url,
            port,
            database_path: get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            session_timeout,
            seed_demo_data: get("SEED_DEMO_DATA").map(|v| parse_flag(&v)).unwrap_or(false),
            bot_api_url,
        })
    }

    /// Full webhook address: the public URL with [`WEBHOOK_PATH`] appended.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when no public URL is configured, which is
    /// fatal in webhook mode.
    pub fn webhook_url(&self) -> AppResult<Url> {
        let base = self
            .public_url
            .as_ref()
            .ok_or_else(|| AppError::Config("PUBLIC_URL (or RENDER_EXTERNAL_URL) is not set".to_string()))?;
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), WEBHOOK_PATH);
        parse_url("PUBLIC_URL", &joined)
    }

    /// Token as a plain string, for the Bot API client only.
    pub fn token(&self) -> &str {
        self.bot_token.expose_secret()
    }
}

/// Database path alone, for commands that never talk to Telegram.
pub fn database_path_from_env() -> String {
    env::var("DATABASE_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
}

/// Log file path (LOG_FILE_PATH), read before the rest of the configuration
/// so that configuration errors are logged too.
pub fn log_file_path_from_env() -> Option<String> {
    env::var("LOG_FILE_PATH").ok().filter(|v| !v.trim().is_empty())
}

fn parse_url(name: &str, raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|e| AppError::Config(format!("{} is not a valid URL ({}): {}", name, raw, e)))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[("PUBLIC_URL", "https://example.org")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_path, DEFAULT_DATABASE_PATH);
        assert!(config.session_timeout.is_none());
        assert!(!config.seed_demo_data);
        assert_eq!(config.token(), "123:abc");
    }

    #[test]
    fn test_webhook_url_requires_public_url() {
        let config = Config::from_lookup(lookup(&[("TELOXIDE_TOKEN", "123:abc")])).unwrap();
        assert!(matches!(config.webhook_url(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_webhook_url_appends_path() {
        let config = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:abc"),
            ("RENDER_EXTERNAL_URL", "https://opi-bot.onrender.com/"),
        ]))
        .unwrap();
        assert_eq!(
            config.webhook_url().unwrap().as_str(),
            "https://opi-bot.onrender.com/webhook"
        );
    }

    #[test]
    fn test_session_timeout_zero_disables_expiry() {
        let config = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("SESSION_TIMEOUT_SECS", "0")])).unwrap();
        assert!(config.session_timeout.is_none());

        let config = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("SESSION_TIMEOUT_SECS", "600")])).unwrap();
        assert_eq!(config.session_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
