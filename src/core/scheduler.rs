use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uuid::Uuid;

use super::counter::IncidentCounter;
use super::messages;
use super::types::{ConversationId, FireTime};

pub type SharedCounter = Arc<Mutex<IncidentCounter>>;

/// Outbound text delivery. Implemented by the transport.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, conversation: ConversationId, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledJob {
    pub id: Uuid,
    pub fire_time: FireTime,
}

/// One daily broadcast job per conversation.
///
/// Jobs live only in memory; they are re-established on restart by the
/// announce chat setting or by users issuing `/setdaily` again.
pub struct DailyScheduler {
    scheduler: JobScheduler,
    tz: Tz,
    counter: SharedCounter,
    sink: Arc<dyn MessageSink>,
    jobs: Mutex<HashMap<ConversationId, ScheduledJob>>,
}

impl DailyScheduler {
    pub fn new(
        scheduler: JobScheduler,
        tz: Tz,
        counter: SharedCounter,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            scheduler,
            tz,
            counter,
            sink,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Schedules the daily broadcast, removing any job the conversation
    /// already had before the new one is registered. A job that cannot be
    /// removed stays tracked and the call fails.
    pub async fn schedule(
        &self,
        conversation: ConversationId,
        fire_time: FireTime,
    ) -> Result<ScheduledJob> {
        let job = self.build_job(conversation, fire_time)?;

        let mut jobs = self.jobs.lock().await;
        if let Some(previous) = jobs.get(&conversation).copied() {
            self.scheduler.remove(&previous.id).await.with_context(|| {
                format!(
                    "removing previous daily job {} for conversation {}",
                    previous.id, conversation
                )
            })?;
            jobs.remove(&conversation);
            info!(
                "Replacing daily job for conversation {} ({} -> {})",
                conversation, previous.fire_time, fire_time
            );
        }

        let id = self
            .scheduler
            .add(job)
            .await
            .with_context(|| format!("registering daily job for conversation {}", conversation))?;
        let scheduled = ScheduledJob { id, fire_time };
        jobs.insert(conversation, scheduled);
        info!(
            "Daily status for conversation {} scheduled at {} {}",
            conversation, fire_time, self.tz
        );
        Ok(scheduled)
    }

    /// Returns whether a job was active.
    pub async fn cancel(&self, conversation: ConversationId) -> Result<bool> {
        let mut jobs = self.jobs.lock().await;
        let Some(previous) = jobs.get(&conversation).copied() else {
            return Ok(false);
        };
        self.scheduler
            .remove(&previous.id)
            .await
            .with_context(|| format!("removing daily job for conversation {}", conversation))?;
        jobs.remove(&conversation);
        info!("Daily status for conversation {} cancelled", conversation);
        Ok(true)
    }

    #[cfg(test)]
    pub async fn scheduled(&self, conversation: ConversationId) -> Option<ScheduledJob> {
        self.jobs.lock().await.get(&conversation).copied()
    }

    pub async fn active_jobs(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn build_job(&self, conversation: ConversationId, fire_time: FireTime) -> Result<Job> {
        let counter = self.counter.clone();
        let sink = self.sink.clone();
        let cron = fire_time.cron_expression();
        Job::new_async_tz(cron.as_str(), self.tz, move |_uuid, mut _l| {
            let counter = counter.clone();
            let sink = sink.clone();
            Box::pin(async move {
                announce(&counter, sink.as_ref(), conversation).await;
            })
        })
        .with_context(|| format!("invalid daily schedule '{}'", cron))
    }
}

/// A single fire: reads the count and hands it to the sink. Delivery errors
/// are logged and leave the schedule untouched.
pub async fn announce(
    counter: &SharedCounter,
    sink: &dyn MessageSink,
    conversation: ConversationId,
) {
    let days = counter.lock().await.days_since(conversation).await;
    let text = messages::days_without_incident(days);
    match sink.send(conversation, &text).await {
        Ok(()) => info!("Daily status sent to conversation {}: {} day(s)", conversation, days),
        Err(e) => error!(
            "Failed to deliver daily status to conversation {}: {:#}",
            conversation, e
        ),
    }
}
