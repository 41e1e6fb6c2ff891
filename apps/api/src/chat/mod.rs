//! Live chat between the studio and its clients or site visitors.
//!
//! Both the client portal and the anonymous site widget go through the single
//! `ConversationService`; the conversation kind keeps their namespaces apart.
//! Every mutation is published on a broadcast channel and streamed as SSE.

pub mod events;
pub mod handlers;
pub mod rules;
pub mod service;

use uuid::Uuid;

use crate::models::chat::{ConversationKind, ConversationRow, SenderTag};

/// Who is acting on a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatActor {
    /// Any back-office user answering on behalf of the studio.
    Admin { user_id: Uuid },
    Client { user_id: Uuid },
    Visitor { visitor_id: Uuid },
}

impl ChatActor {
    pub fn sender_tag(&self) -> SenderTag {
        match self {
            ChatActor::Admin { .. } => SenderTag::Admin,
            ChatActor::Client { .. } => SenderTag::Client,
            ChatActor::Visitor { .. } => SenderTag::Visitor,
        }
    }

    pub fn sender_id(&self) -> Uuid {
        match self {
            ChatActor::Admin { user_id } | ChatActor::Client { user_id } => *user_id,
            ChatActor::Visitor { visitor_id } => *visitor_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, ChatActor::Admin { .. })
    }

    /// Admins see every conversation; participants only their own.
    pub fn can_access(&self, conversation: &ConversationRow) -> bool {
        let kind = ConversationKind::parse(&conversation.kind);
        match self {
            ChatActor::Admin { .. } => true,
            ChatActor::Client { user_id } => {
                kind == Some(ConversationKind::Client) && conversation.owner_id == *user_id
            }
            ChatActor::Visitor { visitor_id } => {
                kind == Some(ConversationKind::Widget) && conversation.owner_id == *visitor_id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn conversation(kind: ConversationKind, owner_id: Uuid) -> ConversationRow {
        ConversationRow {
            id: Uuid::new_v4(),
            kind: kind.as_str().to_string(),
            owner_id,
            display_name: "Dana".to_string(),
            last_message: String::new(),
            last_message_at: None,
            unread_admin: 0,
            unread_participant: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_accesses_everything() {
        let admin = ChatActor::Admin {
            user_id: Uuid::new_v4(),
        };
        assert!(admin.can_access(&conversation(ConversationKind::Client, Uuid::new_v4())));
        assert!(admin.can_access(&conversation(ConversationKind::Widget, Uuid::new_v4())));
    }

    #[test]
    fn test_participants_confined_to_own_namespace() {
        let id = Uuid::new_v4();
        let client = ChatActor::Client { user_id: id };
        let visitor = ChatActor::Visitor { visitor_id: id };

        assert!(client.can_access(&conversation(ConversationKind::Client, id)));
        assert!(!client.can_access(&conversation(ConversationKind::Widget, id)));
        assert!(!client.can_access(&conversation(ConversationKind::Client, Uuid::new_v4())));

        assert!(visitor.can_access(&conversation(ConversationKind::Widget, id)));
        assert!(!visitor.can_access(&conversation(ConversationKind::Client, id)));
    }

    #[test]
    fn test_sender_tags() {
        let id = Uuid::new_v4();
        assert_eq!(ChatActor::Admin { user_id: id }.sender_tag(), SenderTag::Admin);
        assert_eq!(ChatActor::Client { user_id: id }.sender_tag(), SenderTag::Client);
        assert_eq!(ChatActor::Visitor { visitor_id: id }.sender_id(), id);
    }
}
