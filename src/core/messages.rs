//! User-facing reply texts.

use super::types::FireTime;

pub const WELCOME: &str = "\
👋 Hello! I track how many days have passed without an incident.

✅ Use /status to check the current count.
⚠️ Admins can use /reset to reset the counter.
📅 Use /setdaily [HH:MM] to get a daily update here, /stopdaily to stop it.";

pub const RESET_DONE: &str = "🔴 Incident recorded. Counter reset to 0.";

pub const RESET_DENIED: &str = "❌ Only an admin can reset the incident count.";

pub const SETDAILY_USAGE: &str = "Usage: /setdaily [HH:MM]\nExample: /setdaily 09:30";

pub const STOPDAILY_DONE: &str = "🛑 Daily updates stopped for this chat.";

pub const STOPDAILY_NONE: &str = "ℹ️ No daily update is scheduled for this chat.";

pub const SCHEDULE_FAILED: &str = "❌ Could not schedule the daily update. Check the bot logs.";

pub fn days_without_incident(days: i64) -> String {
    format!("📅 Days without an incident: {}", days)
}

pub fn daily_scheduled(fire_time: FireTime, tz: &str) -> String {
    format!("⏰ Daily update scheduled for {} ({}).", fire_time, tz)
}
