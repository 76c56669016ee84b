use std::sync::Arc;
use tracing::{error, info, warn};

use super::auth::{RoleResolver, is_privileged};
use super::messages;
use super::scheduler::{DailyScheduler, SharedCounter};
use super::types::{ConversationId, FireTime, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Status,
    Reset,
    SetDaily,
    StopDaily,
}

impl Command {
    /// Parses `/name[@bot] [args]`. Returns `None` for plain text and
    /// commands this bot does not handle.
    pub fn parse(text: &str) -> Option<(Command, &str)> {
        let rest = text.trim_start().strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let command = match name.as_str() {
            "start" | "help" => Command::Start,
            "status" => Command::Status,
            "reset" => Command::Reset,
            "setdaily" => Command::SetDaily,
            "stopdaily" => Command::StopDaily,
            _ => return None,
        };
        Some((command, args))
    }
}

/// One inbound chat command, already stripped of transport details.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub conversation: ConversationId,
    pub user: Option<UserId>,
    pub command: Command,
    pub raw_text: String,
}

impl InboundCommand {
    pub fn from_text(
        conversation: ConversationId,
        user: Option<UserId>,
        text: &str,
    ) -> Option<Self> {
        let (command, _) = Command::parse(text)?;
        Some(Self {
            conversation,
            user,
            command,
            raw_text: text.to_string(),
        })
    }

    pub fn args(&self) -> &str {
        Command::parse(&self.raw_text)
            .map(|(_, args)| args)
            .unwrap_or("")
    }
}

pub struct Dispatcher {
    counter: SharedCounter,
    roles: Arc<dyn RoleResolver>,
    daily: Arc<DailyScheduler>,
    default_fire_time: FireTime,
}

impl Dispatcher {
    pub fn new(
        counter: SharedCounter,
        roles: Arc<dyn RoleResolver>,
        daily: Arc<DailyScheduler>,
        default_fire_time: FireTime,
    ) -> Self {
        Self {
            counter,
            roles,
            daily,
            default_fire_time,
        }
    }

    /// Runs the command and returns the reply text. Every command gets a reply.
    pub async fn handle(&self, inbound: &InboundCommand) -> String {
        let conversation = inbound.conversation;
        self.counter.lock().await.track(conversation).await;

        match inbound.command {
            Command::Start => messages::WELCOME.to_string(),
            Command::Status => {
                let days = self.counter.lock().await.days_since(conversation).await;
                messages::days_without_incident(days)
            }
            Command::Reset => self.reset(conversation, inbound.user).await,
            Command::SetDaily => self.set_daily(conversation, inbound.args()).await,
            Command::StopDaily => match self.daily.cancel(conversation).await {
                Ok(true) => messages::STOPDAILY_DONE.to_string(),
                Ok(false) => messages::STOPDAILY_NONE.to_string(),
                Err(e) => {
                    error!("Failed to cancel daily job for {}: {:#}", conversation, e);
                    messages::SCHEDULE_FAILED.to_string()
                }
            },
        }
    }

    async fn reset(&self, conversation: ConversationId, user: Option<UserId>) -> String {
        let Some(user) = user else {
            warn!("Reset in conversation {} without a sender, denying", conversation);
            return messages::RESET_DENIED.to_string();
        };
        if !is_privileged(self.roles.as_ref(), conversation, user).await {
            info!("User {} denied reset in conversation {}", user, conversation);
            return messages::RESET_DENIED.to_string();
        }
        if let Err(e) = self.counter.lock().await.reset_today(conversation).await {
            error!(
                "Reset for conversation {} applied in memory but not persisted: {:#}",
                conversation, e
            );
        }
        messages::RESET_DONE.to_string()
    }

    async fn set_daily(&self, conversation: ConversationId, args: &str) -> String {
        let fire_time = if args.is_empty() {
            self.default_fire_time
        } else {
            match args.parse::<FireTime>() {
                Ok(t) => t,
                Err(_) => return messages::SETDAILY_USAGE.to_string(),
            }
        };
        match self.daily.schedule(conversation, fire_time).await {
            Ok(job) => messages::daily_scheduled(job.fire_time, self.daily.timezone().name()),
            Err(e) => {
                error!("Failed to schedule daily job for {}: {:#}", conversation, e);
                messages::SCHEDULE_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::Role;
    use crate::core::auth::testing::StaticRoles;
    use crate::core::clock::testing::ManualClock;
    use crate::core::counter::IncidentCounter;
    use crate::core::scheduler::testing::RecordingSink;
    use crate::core::store::testing::MemoryStateStore;
    use tokio::sync::Mutex;
    use tokio_cron_scheduler::JobScheduler;

    const C1: i64 = -1001;
    const ADMIN: u64 = 1;
    const MEMBER: u64 = 2;

    struct Harness {
        dispatcher: Dispatcher,
        daily: Arc<DailyScheduler>,
        clock: ManualClock,
        store: MemoryStateStore,
    }

    async fn harness() -> Harness {
        let clock = ManualClock::on(2024, 1, 1);
        let store = MemoryStateStore::default();
        let counter = IncidentCounter::open(Arc::new(store.clone()), Arc::new(clock.clone())).await;
        let counter = Arc::new(Mutex::new(counter));
        let daily = Arc::new(DailyScheduler::new(
            JobScheduler::new().await.unwrap(),
            chrono_tz::Asia::Seoul,
            counter.clone(),
            Arc::new(RecordingSink::default()),
        ));
        let roles = StaticRoles::default()
            .with(C1, ADMIN, Role::Admin)
            .with(C1, MEMBER, Role::Member);
        let dispatcher = Dispatcher::new(
            counter,
            Arc::new(roles),
            daily.clone(),
            FireTime::new(23, 0).unwrap(),
        );
        Harness {
            dispatcher,
            daily,
            clock,
            store,
        }
    }

    async fn send(h: &Harness, user: u64, text: &str) -> String {
        let cmd = InboundCommand::from_text(ConversationId(C1), Some(UserId(user)), text)
            .expect("known command");
        h.dispatcher.handle(&cmd).await
    }

    #[test]
    fn parses_commands_with_bot_suffix_and_args() {
        assert_eq!(Command::parse("/status"), Some((Command::Status, "")));
        assert_eq!(Command::parse("/Reset@IncidentBot"), Some((Command::Reset, "")));
        assert_eq!(
            Command::parse("/setdaily@bot   07:15 "),
            Some((Command::SetDaily, "07:15"))
        );
        assert_eq!(Command::parse("/help"), Some((Command::Start, "")));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("status"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn example_scenario() {
        let h = harness().await;
        assert_eq!(send(&h, MEMBER, "/status").await, messages::days_without_incident(0));

        h.clock.set(2024, 1, 5);
        assert_eq!(send(&h, MEMBER, "/status").await, messages::days_without_incident(4));

        assert_eq!(send(&h, ADMIN, "/reset").await, messages::RESET_DONE);
        assert_eq!(send(&h, MEMBER, "/status").await, messages::days_without_incident(0));

        h.clock.set(2024, 1, 6);
        assert_eq!(send(&h, MEMBER, "/reset").await, messages::RESET_DENIED);
        assert_eq!(send(&h, MEMBER, "/status").await, messages::days_without_incident(1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_user_cannot_reset() {
        let h = harness().await;
        h.clock.advance_days(3);
        send(&h, ADMIN, "/status").await;
        assert_eq!(send(&h, 77, "/reset").await, messages::RESET_DENIED);

        let anonymous = InboundCommand::from_text(ConversationId(C1), None, "/reset").unwrap();
        assert_eq!(h.dispatcher.handle(&anonymous).await, messages::RESET_DENIED);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn any_command_creates_the_record() {
        let h = harness().await;
        assert_eq!(send(&h, MEMBER, "/start").await, messages::WELCOME);
        assert!(h.store.snapshot().contains_key(&ConversationId(C1)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reset_replies_even_when_persist_fails() {
        let h = harness().await;
        send(&h, ADMIN, "/status").await;
        h.clock.advance_days(2);
        *h.store.fail_saves.lock().unwrap() = true;

        assert_eq!(send(&h, ADMIN, "/reset").await, messages::RESET_DONE);
        assert_eq!(send(&h, ADMIN, "/status").await, messages::days_without_incident(0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn setdaily_uses_default_or_argument_and_replaces() {
        let h = harness().await;
        let c = ConversationId(C1);

        let reply = send(&h, MEMBER, "/setdaily").await;
        assert_eq!(reply, messages::daily_scheduled(FireTime::new(23, 0).unwrap(), "Asia/Seoul"));
        assert_eq!(h.daily.scheduled(c).await.unwrap().fire_time, FireTime::new(23, 0).unwrap());

        send(&h, MEMBER, "/setdaily 07:30").await;
        assert_eq!(h.daily.active_jobs().await, 1);
        assert_eq!(h.daily.scheduled(c).await.unwrap().fire_time, FireTime::new(7, 30).unwrap());

        assert_eq!(send(&h, MEMBER, "/setdaily 25:00").await, messages::SETDAILY_USAGE);
        assert_eq!(h.daily.scheduled(c).await.unwrap().fire_time, FireTime::new(7, 30).unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stopdaily_reports_whether_a_job_existed() {
        let h = harness().await;
        assert_eq!(send(&h, MEMBER, "/stopdaily").await, messages::STOPDAILY_NONE);
        send(&h, MEMBER, "/setdaily").await;
        assert_eq!(send(&h, MEMBER, "/stopdaily").await, messages::STOPDAILY_DONE);
        assert_eq!(h.daily.active_jobs().await, 0);
    }
}
