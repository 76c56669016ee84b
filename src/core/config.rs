use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;

use super::types::{ConversationId, FireTime};

pub const TOKEN_ENV: &str = "BOT_TOKEN";
pub const DATA_DIR_ENV: &str = "INCIDENT_DAYS_DATA_DIR";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Seoul;

/// Contents of `<data_dir>/config.toml`. Every key is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub daily_time: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub announce_chat: Option<i64>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl FileConfig {
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("reading {}", config_path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", config_path.display()))
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub daily_time: Option<String>,
    pub timezone: Option<String>,
    pub state_file: Option<PathBuf>,
    pub announce_chat: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved runtime settings, minus the secret token.
#[derive(Debug, Clone)]
pub struct Settings {
    pub daily_time: FireTime,
    pub timezone: Tz,
    pub state_file: PathBuf,
    pub announce_chat: Option<ConversationId>,
    pub log_level: Level,
}

impl Settings {
    /// Layers defaults, config file, environment and overrides, in that order.
    pub fn resolve(
        data_dir: &Path,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let daily_time = overrides
            .daily_time
            .clone()
            .or_else(|| var("DAILY_TIME"))
            .or(file.daily_time);
        let daily_time = match daily_time {
            Some(raw) => raw
                .parse::<FireTime>()
                .with_context(|| format!("invalid daily time '{}'", raw))?,
            None => FireTime::default(),
        };

        let timezone = overrides
            .timezone
            .clone()
            .or_else(|| var("INCIDENT_TZ"))
            .or(file.timezone);
        let timezone = match timezone {
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .map_err(|_| anyhow!("unknown timezone '{}'", raw))?,
            None => DEFAULT_TIMEZONE,
        };

        let state_file = overrides
            .state_file
            .clone()
            .or_else(|| var("STATE_FILE").map(PathBuf::from))
            .or(file.state_file)
            .unwrap_or_else(|| data_dir.join("incidents.json"));

        let announce_chat = match overrides.announce_chat.clone().or_else(|| var("ANNOUNCE_CHAT")) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<i64>()
                    .with_context(|| format!("invalid announce chat id '{}'", raw))?,
            ),
            None => file.announce_chat,
        }
        .map(ConversationId);

        let log_level = overrides
            .log_level
            .clone()
            .or_else(|| var("LOG_LEVEL"))
            .or(file.log_level);
        let log_level = match log_level {
            Some(raw) => raw
                .trim()
                .parse::<Level>()
                .map_err(|_| anyhow!("invalid log level '{}'", raw))?,
            None => Level::INFO,
        };

        Ok(Self {
            daily_time,
            timezone,
            state_file,
            announce_chat,
            log_level,
        })
    }

    /// Reads the config file under the data dir and the process environment.
    pub async fn load(overrides: &Overrides) -> Result<Self> {
        let data_dir = data_dir()?;
        let file = FileConfig::load(&data_dir).await?;
        Self::resolve(&data_dir, file, |key| std::env::var(key).ok(), overrides)
    }
}

/// `$INCIDENT_DAYS_DATA_DIR`, or `~/.incident-days`.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".incident-days"))
        .ok_or_else(|| anyhow!("could not determine home directory; set {}", DATA_DIR_ENV))
}

/// The bot token is required to run; its absence is fatal.
pub fn bot_token(env: impl Fn(&str) -> Option<String>) -> Result<String> {
    match env(TOKEN_ENV) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => bail!("{} environment variable is missing", TOKEN_ENV),
    }
}
