// Process configuration, loaded from environment variables and CLI flags.

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:clan_bot.db?mode=rwc";
pub const DEFAULT_RUNEMETRICS_URL: &str = "https://apps.runescape.com/runemetrics/profile/profile";
pub const DEFAULT_HISCORES_URL: &str = "https://secure.runescape.com/m=hiscore/index_lite.ws";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOT_TOKEN environment variable not set")]
    MissingToken,
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret shared with the chat-platform adapter.
    pub bot_token: String,
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// RuneMetrics profile endpoint (without query string).
    pub runemetrics_url: String,
    /// Hiscores index_lite endpoint (without query string).
    pub hiscores_url: String,
}

impl Config {
    /// Load configuration from the process environment and CLI arguments.
    ///
    /// Environment variables:
    /// - `BOT_TOKEN` - required bot token
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:clan_bot.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `RUNEMETRICS_URL` / `HISCORES_URL` - upstream endpoint overrides
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_lookup(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an arbitrary variable lookup.
    pub fn from_lookup<F>(args: &[String], var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = var("BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = match Self::parse_cli_value(args, "--port").or_else(|| var("PORT")) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        let runemetrics_url =
            var("RUNEMETRICS_URL").unwrap_or_else(|| DEFAULT_RUNEMETRICS_URL.to_string());
        let hiscores_url = var("HISCORES_URL").unwrap_or_else(|| DEFAULT_HISCORES_URL.to_string());

        Ok(Config {
            bot_token,
            database_url,
            port,
            runemetrics_url,
            hiscores_url,
        })
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}
