use anyhow::{Context, Result, bail};

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{Overrides, Settings};
use crate::core::counter::days_between;
use crate::core::store::{JsonStateStore, StateStore};
use crate::core::terminal::{print_days, print_info, print_status};
use crate::core::types::ConversationId;

/// Read-only view of one conversation's counter; never writes the state file.
pub async fn show_status(overrides: Overrides, chat: Option<String>) -> Result<()> {
    let Some(chat) = chat else {
        bail!("status requires --chat <id>");
    };
    let conversation = ConversationId(
        chat.trim()
            .parse()
            .with_context(|| format!("invalid chat id '{}'", chat))?,
    );

    let settings = Settings::load(&overrides).await?;
    let store = JsonStateStore::new(&settings.state_file);
    let book = store.load().await;
    let today = SystemClock::new(settings.timezone).today();

    print_status("State file", &store.path().display().to_string());
    match book.get(&conversation) {
        Some(record) => {
            print_status("Last reset", &record.last_reset_date.to_string());
            print_days(&conversation.to_string(), days_between(record.last_reset_date, today));
        }
        None => {
            print_info("Conversation is not tracked yet; it starts at 0 on first use.");
            print_days(&conversation.to_string(), 0);
        }
    }
    Ok(())
}
