use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::chat::events::{publish, ChatEvent, ChatEventKind};
use crate::chat::rules::{check_can_modify, clean_message_text, preview, unread_increments};
use crate::chat::ChatActor;
use crate::errors::AppError;
use crate::models::chat::{ConversationKind, ConversationRow, MessageRow};
use crate::state::AppState;

/// All chat reads and writes. Message rows and conversation metadata change
/// together inside one transaction, then the change is broadcast.
#[derive(Clone)]
pub struct ConversationService {
    db: PgPool,
    events: broadcast::Sender<ChatEvent>,
    edit_window_secs: i64,
}

impl ConversationService {
    pub fn new(db: PgPool, events: broadcast::Sender<ChatEvent>, edit_window_secs: i64) -> Self {
        Self {
            db,
            events,
            edit_window_secs,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            state.chat_events.clone(),
            state.config.chat_edit_window_secs,
        )
    }

    pub fn edit_window_secs(&self) -> i64 {
        self.edit_window_secs
    }

    /// Returns the existing conversation for `(kind, owner_id)` or opens a new one.
    pub async fn get_or_create(
        &self,
        kind: ConversationKind,
        owner_id: Uuid,
        display_name: &str,
    ) -> Result<ConversationRow, AppError> {
        let conversation = sqlx::query_as::<_, ConversationRow>(
            r#"
            INSERT INTO conversations (id, kind, owner_id, display_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, owner_id)
            DO UPDATE SET display_name = conversations.display_name
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(owner_id)
        .bind(display_name)
        .fetch_one(&self.db)
        .await?;
        Ok(conversation)
    }

    pub async fn find(
        &self,
        kind: ConversationKind,
        owner_id: Uuid,
    ) -> Result<Option<ConversationRow>, AppError> {
        let conversation = sqlx::query_as::<_, ConversationRow>(
            "SELECT * FROM conversations WHERE kind = $1 AND owner_id = $2",
        )
        .bind(kind.as_str())
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(conversation)
    }

    pub async fn get(&self, id: Uuid) -> Result<ConversationRow, AppError> {
        sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Conversation {id} not found")))
    }

    /// Loads a conversation the actor is allowed to see. Foreign ids look missing.
    pub async fn get_for(&self, id: Uuid, actor: &ChatActor) -> Result<ConversationRow, AppError> {
        let conversation = self.get(id).await?;
        if !actor.can_access(&conversation) {
            return Err(AppError::NotFound(format!("Conversation {id} not found")));
        }
        Ok(conversation)
    }

    /// Sidebar listing, most recent activity first.
    pub async fn list(&self, kind: Option<ConversationKind>) -> Result<Vec<ConversationRow>, AppError> {
        let conversations = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT * FROM conversations
            WHERE ($1::TEXT IS NULL OR kind = $1)
            ORDER BY COALESCE(last_message_at, created_at) DESC
            "#,
        )
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.db)
        .await?;
        Ok(conversations)
    }

    pub async fn messages(&self, conversation_id: Uuid) -> Result<Vec<MessageRow>, AppError> {
        let messages = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM chat_messages WHERE conversation_id = $1 ORDER BY created_at, id",
        )
        .bind(conversation_id)
        .fetch_all(&self.db)
        .await?;
        Ok(messages)
    }

    pub async fn send(
        &self,
        conversation: &ConversationRow,
        actor: &ChatActor,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageRow, AppError> {
        if !actor.can_access(conversation) {
            return Err(AppError::NotFound(format!(
                "Conversation {} not found",
                conversation.id
            )));
        }
        let text = clean_message_text(text)?;
        let (admin_inc, participant_inc) = unread_increments(actor);

        let mut tx = self.db.begin().await?;
        let message = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO chat_messages (id, conversation_id, sender, sender_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation.id)
        .bind(actor.sender_tag().as_str())
        .bind(actor.sender_id())
        .bind(&text)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let meta = sqlx::query_as::<_, ConversationRow>(
            r#"
            UPDATE conversations
            SET last_message = $2,
                last_message_at = $3,
                unread_admin = unread_admin + $4,
                unread_participant = unread_participant + $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(conversation.id)
        .bind(preview(&text))
        .bind(message.created_at)
        .bind(admin_inc)
        .bind(participant_inc)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        publish(
            &self.events,
            ChatEvent {
                kind: ChatEventKind::MessageCreated,
                conversation_id: meta.id,
                conversation: Some(meta),
                message: Some(message.clone()),
            },
        );
        Ok(message)
    }

    pub async fn edit(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        actor: &ChatActor,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageRow, AppError> {
        let text = clean_message_text(text)?;
        let mut tx = self.db.begin().await?;
        let current = lock_message(&mut tx, conversation_id, message_id).await?;
        check_can_modify(&current, actor, now, self.edit_window_secs)?;

        let message = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE chat_messages
            SET text = $2, is_edited = TRUE, edited_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(&text)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        let meta = refresh_meta(&mut tx, conversation_id).await?;
        tx.commit().await?;

        publish(
            &self.events,
            ChatEvent {
                kind: ChatEventKind::MessageUpdated,
                conversation_id,
                conversation: Some(meta),
                message: Some(message.clone()),
            },
        );
        Ok(message)
    }

    /// Soft delete: the row stays with empty text so the thread keeps its shape.
    pub async fn delete_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        actor: &ChatActor,
        now: DateTime<Utc>,
    ) -> Result<MessageRow, AppError> {
        let mut tx = self.db.begin().await?;
        let current = lock_message(&mut tx, conversation_id, message_id).await?;
        check_can_modify(&current, actor, now, self.edit_window_secs)?;

        let message = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE chat_messages
            SET text = '', is_deleted = TRUE, edited_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        let meta = refresh_meta(&mut tx, conversation_id).await?;
        tx.commit().await?;

        publish(
            &self.events,
            ChatEvent {
                kind: ChatEventKind::MessageDeleted,
                conversation_id,
                conversation: Some(meta),
                message: Some(message.clone()),
            },
        );
        Ok(message)
    }

    /// Resets the unread counter on the actor's side of the conversation.
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        actor: &ChatActor,
    ) -> Result<ConversationRow, AppError> {
        let sql = if actor.is_admin() {
            "UPDATE conversations SET unread_admin = 0 WHERE id = $1 RETURNING *"
        } else {
            "UPDATE conversations SET unread_participant = 0 WHERE id = $1 RETURNING *"
        };
        let meta = sqlx::query_as::<_, ConversationRow>(sql)
            .bind(conversation_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Conversation {conversation_id} not found")))?;

        publish(
            &self.events,
            ChatEvent {
                kind: ChatEventKind::ConversationRead,
                conversation_id,
                conversation: Some(meta.clone()),
                message: None,
            },
        );
        Ok(meta)
    }

    pub async fn delete_conversation(&self, conversation_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Conversation {conversation_id} not found"
            )));
        }

        publish(
            &self.events,
            ChatEvent {
                kind: ChatEventKind::ConversationDeleted,
                conversation_id,
                conversation: None,
                message: None,
            },
        );
        Ok(())
    }
}

async fn lock_message(
    tx: &mut Transaction<'_, Postgres>,
    conversation_id: Uuid,
    message_id: Uuid,
) -> Result<MessageRow, AppError> {
    sqlx::query_as::<_, MessageRow>(
        "SELECT * FROM chat_messages WHERE id = $1 AND conversation_id = $2 FOR UPDATE",
    )
    .bind(message_id)
    .bind(conversation_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Message {message_id} not found")))
}

/// Recomputes the preview from the newest message that was not deleted.
async fn refresh_meta(
    tx: &mut Transaction<'_, Postgres>,
    conversation_id: Uuid,
) -> Result<ConversationRow, AppError> {
    let latest: Option<(String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT text, created_at FROM chat_messages
        WHERE conversation_id = $1 AND NOT is_deleted
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(&mut **tx)
    .await?;

    let (last_message, last_message_at) = match latest {
        Some((text, at)) => (preview(&text), Some(at)),
        None => (String::new(), None),
    };

    let meta = sqlx::query_as::<_, ConversationRow>(
        r#"
        UPDATE conversations
        SET last_message = $2,
            last_message_at = COALESCE($3, last_message_at)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(conversation_id)
    .bind(last_message)
    .bind(last_message_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(meta)
}
