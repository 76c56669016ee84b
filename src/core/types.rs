use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a group conversation. Telegram chat ids fit in an i64.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted state for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IncidentRecord {
    pub last_reset_date: NaiveDate,
}

impl IncidentRecord {
    pub fn new(last_reset_date: NaiveDate) -> Self {
        Self { last_reset_date }
    }
}

/// Wall-clock time of day at which the daily broadcast fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireTime {
    pub hour: u32,
    pub minute: u32,
}

impl FireTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 {
            bail!("hour must be between 0 and 23, got {}", hour);
        }
        if minute > 59 {
            bail!("minute must be between 0 and 59, got {}", minute);
        }
        Ok(Self { hour, minute })
    }

    /// Six-field cron expression (sec min hour dom mon dow) firing once a day.
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl Default for FireTime {
    fn default() -> Self {
        Self { hour: 8, minute: 0 }
    }
}

impl FromStr for FireTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((h, m)) = s.trim().split_once(':') else {
            bail!("expected HH:MM, got '{}'", s);
        };
        let hour: u32 = h
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid hour in '{}'", s))?;
        let minute: u32 = m
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid minute in '{}'", s))?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for FireTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
