use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::chat::ChatActor;
use crate::errors::AppError;
use crate::models::chat::MessageRow;

pub const MAX_MESSAGE_CHARS: usize = 2000;
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Error, PartialEq)]
pub enum ChatRuleError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("message exceeds {0} characters")]
    TooLong(usize),

    #[error("only the sender can change this message")]
    NotSender,

    #[error("messages can only be changed within {0} seconds of sending")]
    WindowElapsed(i64),

    #[error("message was already deleted")]
    AlreadyDeleted,
}

impl From<ChatRuleError> for AppError {
    fn from(err: ChatRuleError) -> Self {
        match err {
            ChatRuleError::NotSender => AppError::Forbidden,
            ChatRuleError::AlreadyDeleted => AppError::Conflict(err.to_string()),
            ChatRuleError::WindowElapsed(_) => AppError::UnprocessableEntity(err.to_string()),
            ChatRuleError::EmptyMessage | ChatRuleError::TooLong(_) => {
                AppError::Validation(err.to_string())
            }
        }
    }
}

pub fn clean_message_text(text: &str) -> Result<String, ChatRuleError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatRuleError::EmptyMessage);
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatRuleError::TooLong(MAX_MESSAGE_CHARS));
    }
    Ok(text.to_string())
}

/// A message stamped slightly ahead of the server clock still counts as fresh.
pub fn within_edit_window(sent_at: DateTime<Utc>, now: DateTime<Utc>, window_secs: i64) -> bool {
    now - sent_at <= Duration::seconds(window_secs)
}

pub fn is_sender(message: &MessageRow, actor: &ChatActor) -> bool {
    message.sender == actor.sender_tag().as_str() && message.sender_id == Some(actor.sender_id())
}

/// Edit and delete share one rule: the sender, within the window, not yet deleted.
pub fn check_can_modify(
    message: &MessageRow,
    actor: &ChatActor,
    now: DateTime<Utc>,
    window_secs: i64,
) -> Result<(), ChatRuleError> {
    if !is_sender(message, actor) {
        return Err(ChatRuleError::NotSender);
    }
    if message.is_deleted {
        return Err(ChatRuleError::AlreadyDeleted);
    }
    if !within_edit_window(message.created_at, now, window_secs) {
        return Err(ChatRuleError::WindowElapsed(window_secs));
    }
    Ok(())
}

/// `(unread_admin, unread_participant)` deltas for a message sent by `actor`.
/// The side that did not send it gets the new unread message.
pub fn unread_increments(actor: &ChatActor) -> (i32, i32) {
    if actor.is_admin() {
        (0, 1)
    } else {
        (1, 0)
    }
}

/// Sidebar preview: first line, cut at a character boundary.
pub fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= PREVIEW_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn sent_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
    }

    fn message_from(actor: &ChatActor) -> MessageRow {
        MessageRow {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender: actor.sender_tag().as_str().to_string(),
            sender_id: Some(actor.sender_id()),
            text: "Hello".to_string(),
            is_edited: false,
            is_deleted: false,
            created_at: sent_at(),
            edited_at: None,
        }
    }

    #[test]
    fn test_clean_message_text() {
        assert_eq!(clean_message_text("  hi  ").unwrap(), "hi");
        assert_eq!(clean_message_text(" \n "), Err(ChatRuleError::EmptyMessage));
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            clean_message_text(&long),
            Err(ChatRuleError::TooLong(MAX_MESSAGE_CHARS))
        );
    }

    #[test]
    fn test_window_boundary() {
        assert!(within_edit_window(sent_at(), sent_at() + Duration::seconds(300), 300));
        assert!(!within_edit_window(sent_at(), sent_at() + Duration::seconds(301), 300));
        assert!(within_edit_window(sent_at(), sent_at() - Duration::seconds(5), 300));
    }

    #[test]
    fn test_sender_can_modify_inside_window() {
        let actor = ChatActor::Client {
            user_id: Uuid::new_v4(),
        };
        let message = message_from(&actor);
        assert!(check_can_modify(&message, &actor, sent_at() + Duration::minutes(4), 300).is_ok());
    }

    #[test]
    fn test_window_elapsed_after_five_minutes() {
        let actor = ChatActor::Visitor {
            visitor_id: Uuid::new_v4(),
        };
        let message = message_from(&actor);
        assert_eq!(
            check_can_modify(&message, &actor, sent_at() + Duration::minutes(6), 300),
            Err(ChatRuleError::WindowElapsed(300))
        );
    }

    #[test]
    fn test_other_admin_cannot_modify() {
        let author = ChatActor::Admin {
            user_id: Uuid::new_v4(),
        };
        let other = ChatActor::Admin {
            user_id: Uuid::new_v4(),
        };
        let message = message_from(&author);
        assert_eq!(
            check_can_modify(&message, &other, sent_at(), 300),
            Err(ChatRuleError::NotSender)
        );
    }

    #[test]
    fn test_same_id_different_role_is_not_sender() {
        let id = Uuid::new_v4();
        let message = message_from(&ChatActor::Client { user_id: id });
        assert!(!is_sender(&message, &ChatActor::Admin { user_id: id }));
    }

    #[test]
    fn test_deleted_message_cannot_change() {
        let actor = ChatActor::Client {
            user_id: Uuid::new_v4(),
        };
        let mut message = message_from(&actor);
        message.is_deleted = true;
        assert_eq!(
            check_can_modify(&message, &actor, sent_at(), 300),
            Err(ChatRuleError::AlreadyDeleted)
        );
    }

    #[test]
    fn test_rule_errors_map_to_http() {
        assert!(matches!(AppError::from(ChatRuleError::NotSender), AppError::Forbidden));
        assert!(matches!(
            AppError::from(ChatRuleError::WindowElapsed(300)),
            AppError::UnprocessableEntity(_)
        ));
    }

    #[test]
    fn test_unread_increments_go_to_the_other_side() {
        let id = Uuid::new_v4();
        assert_eq!(unread_increments(&ChatActor::Admin { user_id: id }), (0, 1));
        assert_eq!(unread_increments(&ChatActor::Client { user_id: id }), (1, 0));
        assert_eq!(unread_increments(&ChatActor::Visitor { visitor_id: id }), (1, 0));
    }

    #[test]
    fn test_preview_truncates_first_line() {
        assert_eq!(preview("Hi there\nsecond line"), "Hi there");
        let long = "é".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 80);
        assert!(p.ends_with('…'));
    }
}
