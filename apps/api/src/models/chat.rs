use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which front door a conversation was opened from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Signed-in client, keyed by user id.
    Client,
    /// Anonymous site visitor using the chat widget, keyed by visitor id.
    Widget,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Client => "client",
            ConversationKind::Widget => "widget",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "client" => Some(ConversationKind::Client),
            "widget" => Some(ConversationKind::Widget),
            _ => None,
        }
    }
}

/// Sender tag stored on every message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderTag {
    Admin,
    Client,
    Visitor,
}

impl SenderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderTag::Admin => "admin",
            SenderTag::Client => "client",
            SenderTag::Visitor => "visitor",
        }
    }
}

/// Per-conversation summary used by the admin sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationRow {
    pub id: Uuid,
    pub kind: String,
    pub owner_id: Uuid,
    pub display_name: String,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_admin: i32,
    pub unread_participant: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: String,
    pub sender_id: Option<Uuid>,
    pub text: String,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}
