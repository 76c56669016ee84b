use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};

use super::clock::Clock;
use super::store::{IncidentBook, StateStore};
use super::types::{ConversationId, IncidentRecord};

/// Days-since-incident bookkeeping for every conversation.
///
/// All reads and writes go through `&mut self`; callers share one instance
/// behind a `tokio::sync::Mutex` so scheduler fires and chat commands are
/// serialized onto a single mutation path.
pub struct IncidentCounter {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    book: IncidentBook,
}

impl IncidentCounter {
    pub async fn open(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        let book = store.load().await;
        info!("Loaded incident state for {} conversation(s)", book.len());
        Self { store, clock, book }
    }

    /// Whole calendar days between the last reset and today.
    pub async fn days_since(&mut self, conversation: ConversationId) -> i64 {
        let today = self.clock.today();
        let record = self.record_for(conversation).await;
        days_between(record.last_reset_date, today)
    }

    /// Marks today as the last incident and persists before returning.
    /// The in-memory record is updated even if persisting fails.
    pub async fn reset_today(&mut self, conversation: ConversationId) -> Result<()> {
        let today = self.clock.today();
        self.book.insert(conversation, IncidentRecord::new(today));
        info!("Incident counter for conversation {} reset on {}", conversation, today);
        self.store.save(&self.book).await
    }

    /// Creates the record for an unseen conversation, starting today.
    pub async fn track(&mut self, conversation: ConversationId) {
        self.record_for(conversation).await;
    }

    async fn record_for(&mut self, conversation: ConversationId) -> IncidentRecord {
        if let Some(record) = self.book.get(&conversation) {
            return record.clone();
        }
        let record = IncidentRecord::new(self.clock.today());
        self.book.insert(conversation, record.clone());
        info!(
            "Tracking new conversation {} from {}",
            conversation, record.last_reset_date
        );
        if let Err(e) = self.store.save(&self.book).await {
            error!("Failed to persist new conversation {}: {:#}", conversation, e);
        }
        record
    }
}

/// Calendar-day difference, clamped at zero if the clock went backwards.
pub fn days_between(last_reset: NaiveDate, today: NaiveDate) -> i64 {
    (today - last_reset).num_days().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::testing::ManualClock;
    use crate::core::store::testing::MemoryStateStore;

    async fn counter_on(clock: &ManualClock, store: &MemoryStateStore) -> IncidentCounter {
        IncidentCounter::open(Arc::new(store.clone()), Arc::new(clock.clone())).await
    }

    #[tokio::test]
    async fn unseen_conversation_starts_at_zero_and_is_persisted() {
        let clock = ManualClock::on(2024, 1, 1);
        let store = MemoryStateStore::default();
        let mut counter = counter_on(&clock, &store).await;

        assert_eq!(counter.days_since(ConversationId(1)).await, 0);
        assert_eq!(
            store.snapshot().get(&ConversationId(1)),
            Some(&IncidentRecord::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
        );
    }

    #[tokio::test]
    async fn status_reads_do_not_rewrite_known_records() {
        let clock = ManualClock::on(2024, 1, 1);
        let store = MemoryStateStore::default();
        let mut counter = counter_on(&clock, &store).await;
        counter.days_since(ConversationId(1)).await;
        let saves = store.save_count();

        clock.advance_days(3);
        assert_eq!(counter.days_since(ConversationId(1)).await, 3);
        assert_eq!(store.save_count(), saves);
    }

    #[tokio::test]
    async fn reset_is_idempotent_within_a_day() {
        let clock = ManualClock::on(2024, 2, 10);
        let store = MemoryStateStore::default();
        let mut counter = counter_on(&clock, &store).await;
        let c = ConversationId(7);
        counter.days_since(c).await;
        clock.advance_days(5);

        counter.reset_today(c).await.unwrap();
        assert_eq!(counter.days_since(c).await, 0);
        counter.reset_today(c).await.unwrap();
        assert_eq!(counter.days_since(c).await, 0);
    }

    #[tokio::test]
    async fn days_never_decrease_between_resets() {
        let clock = ManualClock::on(2023, 12, 30);
        let store = MemoryStateStore::default();
        let mut counter = counter_on(&clock, &store).await;
        let c = ConversationId(3);

        let mut last = counter.days_since(c).await;
        for _ in 0..70 {
            clock.advance_days(1);
            let now = counter.days_since(c).await;
            assert!(now >= last);
            assert_eq!(now, last + 1);
            last = now;
        }
    }

    #[tokio::test]
    async fn calendar_days_cross_leap_day() {
        let clock = ManualClock::on(2024, 2, 28);
        let store = MemoryStateStore::default();
        let mut counter = counter_on(&clock, &store).await;
        let c = ConversationId(11);
        counter.days_since(c).await;
        clock.set(2024, 3, 1);
        assert_eq!(counter.days_since(c).await, 2);
    }

    #[tokio::test]
    async fn clock_moving_backwards_reports_zero() {
        let clock = ManualClock::on(2024, 5, 5);
        let store = MemoryStateStore::default();
        let mut counter = counter_on(&clock, &store).await;
        let c = ConversationId(12);
        counter.reset_today(c).await.unwrap();
        clock.set(2024, 5, 1);
        assert_eq!(counter.days_since(c).await, 0);
    }

    #[tokio::test]
    async fn reset_survives_failed_persist_in_memory() {
        let clock = ManualClock::on(2024, 1, 1);
        let store = MemoryStateStore::default();
        let mut counter = counter_on(&clock, &store).await;
        let c = ConversationId(5);
        counter.days_since(c).await;
        clock.advance_days(9);

        *store.fail_saves.lock().unwrap() = true;
        assert!(counter.reset_today(c).await.is_err());
        assert_eq!(counter.days_since(c).await, 0);
    }

    #[tokio::test]
    async fn reopening_reads_previous_state() {
        let clock = ManualClock::on(2024, 1, 1);
        let store = MemoryStateStore::default();
        {
            let mut counter = counter_on(&clock, &store).await;
            counter.days_since(ConversationId(1)).await;
        }
        clock.set(2024, 1, 5);
        let mut counter = counter_on(&clock, &store).await;
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(counter.days_since(ConversationId(1)).await, 4);
    }
}
