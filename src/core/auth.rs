use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::types::{ConversationId, UserId};

/// Membership role of a user within a conversation, independent of the
/// transport's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    Member,
    Other,
}

impl Role {
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Looks up a user's role in a conversation. Implemented by the transport.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn role_of(&self, conversation: ConversationId, user: UserId) -> Result<Role>;
}

/// Fails closed: a lookup error counts as "not privileged".
pub async fn is_privileged(
    resolver: &dyn RoleResolver,
    conversation: ConversationId,
    user: UserId,
) -> bool {
    match resolver.role_of(conversation, user).await {
        Ok(role) => {
            debug!("User {} has role {:?} in {}", user, role, conversation);
            role.is_privileged()
        }
        Err(e) => {
            warn!(
                "Role lookup for user {} in conversation {} failed, denying: {:#}",
                user, conversation, e
            );
            false
        }
    }
}
