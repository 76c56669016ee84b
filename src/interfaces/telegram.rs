use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ChatMemberKind};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::core::auth::{Role, RoleResolver};
use crate::core::dispatcher::{Dispatcher, InboundCommand};
use crate::core::lifecycle::LifecycleComponent;
use crate::core::scheduler::MessageSink;
use crate::core::types::{ConversationId, UserId};

/// Maps Telegram's membership status onto the transport-neutral role.
pub fn role_from_kind(kind: &ChatMemberKind) -> Role {
    if kind.is_owner() {
        Role::Owner
    } else if kind.is_administrator() {
        Role::Admin
    } else if kind.is_member() {
        Role::Member
    } else {
        Role::Other
    }
}

#[derive(Clone)]
pub struct TelegramRoles {
    bot: Bot,
}

impl TelegramRoles {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl RoleResolver for TelegramRoles {
    async fn role_of(&self, conversation: ConversationId, user: UserId) -> Result<Role> {
        let member = self
            .bot
            .get_chat_member(ChatId(conversation.0), teloxide::types::UserId(user.0))
            .await
            .with_context(|| format!("getChatMember({}, {})", conversation, user))?;
        Ok(role_from_kind(&member.kind))
    }
}

#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, conversation: ConversationId, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(conversation.0), text)
            .await
            .with_context(|| format!("sendMessage to {}", conversation))?;
        Ok(())
    }
}

pub struct TelegramInterface {
    bot: Bot,
    dispatcher: Arc<Dispatcher>,
    poller: Option<JoinHandle<()>>,
}

impl TelegramInterface {
    pub fn new(bot: Bot, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            bot,
            dispatcher,
            poller: None,
        }
    }

    async fn start_bot(&mut self) -> Result<()> {
        let commands = vec![
            BotCommand::new("start", "Show what this bot does"),
            BotCommand::new("status", "Days without an incident"),
            BotCommand::new("reset", "Record an incident (admins only)"),
            BotCommand::new("setdaily", "Post the count here every day [HH:MM]"),
            BotCommand::new("stopdaily", "Stop the daily post"),
        ];
        if let Err(e) = self.bot.set_my_commands(commands).await {
            error!("Failed to set telegram bot commands: {}", e);
        }

        let bot_client = self.bot.clone();
        let dispatcher = self.dispatcher.clone();

        self.poller = Some(tokio::spawn(async move {
            teloxide::repl(bot_client, move |bot: Bot, msg: Message| {
                let dispatcher = dispatcher.clone();
                async move {
                    let Some(text) = msg.text() else {
                        return Ok(());
                    };
                    let conversation = ConversationId(msg.chat.id.0);
                    let user = msg.from.as_ref().map(|u| UserId(u.id.0));
                    let Some(inbound) = InboundCommand::from_text(conversation, user, text) else {
                        debug!("Ignoring non-command message in {}", conversation);
                        return Ok(());
                    };

                    info!(
                        "Received /{:?} in conversation {}",
                        inbound.command, conversation
                    );
                    let reply = dispatcher.handle(&inbound).await;
                    if let Err(e) = bot.send_message(msg.chat.id, reply).await {
                        error!("Failed to reply in conversation {}: {}", conversation, e);
                    }
                    Ok(())
                }
            })
            .await;
        }));
        Ok(())
    }
}

#[async_trait]
impl LifecycleComponent for TelegramInterface {
    async fn on_init(&mut self) -> Result<()> {
        info!("Telegram Interface initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        info!("Telegram Interface starting...");
        if let Err(e) = self.start_bot().await {
            error!("Telegram Bot crashed: {}", e);
        }
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("Telegram Interface shutting down...");
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        Ok(())
    }
}
