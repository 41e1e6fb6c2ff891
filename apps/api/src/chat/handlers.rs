use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::chat::events::event_stream;
use crate::chat::rules::check_can_modify;
use crate::chat::service::ConversationService;
use crate::chat::ChatActor;
use crate::errors::AppError;
use crate::models::chat::{ConversationKind, ConversationRow, MessageRow};
use crate::models::user::Role;
use crate::state::AppState;
use crate::validation::optional_text;

const DEFAULT_VISITOR_NAME: &str = "Visitor";

#[derive(Debug, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: MessageRow,
    /// Whether the caller may still edit or delete this message.
    pub can_modify: bool,
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub conversation: ConversationRow,
    pub messages: Vec<MessageView>,
    pub edit_window_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationQuery {
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WidgetSessionRequest {
    pub display_name: Option<String>,
    pub visitor_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct WidgetSessionResponse {
    pub visitor_id: Uuid,
    pub conversation: ConversationRow,
}

pub fn message_views(
    messages: Vec<MessageRow>,
    actor: &ChatActor,
    now: DateTime<Utc>,
    window_secs: i64,
) -> Vec<MessageView> {
    messages
        .into_iter()
        .map(|message| {
            let can_modify = check_can_modify(&message, actor, now, window_secs).is_ok();
            MessageView {
                message,
                can_modify,
            }
        })
        .collect()
}

async fn thread(
    service: &ConversationService,
    conversation: ConversationRow,
    actor: &ChatActor,
) -> Result<ThreadResponse, AppError> {
    let messages = service.messages(conversation.id).await?;
    Ok(ThreadResponse {
        messages: message_views(messages, actor, Utc::now(), service.edit_window_secs()),
        conversation,
        edit_window_secs: service.edit_window_secs(),
    })
}

fn admin_actor(auth: &AuthUser) -> Result<ChatActor, AppError> {
    auth.require_back_office()?;
    Ok(ChatActor::Admin {
        user_id: auth.user.id,
    })
}

async fn client_conversation(
    service: &ConversationService,
    auth: &AuthUser,
) -> Result<(ConversationRow, ChatActor), AppError> {
    if auth.role() != Role::Client {
        return Err(AppError::Forbidden);
    }
    let conversation = service
        .get_or_create(ConversationKind::Client, auth.user.id, &auth.user.name)
        .await?;
    let actor = ChatActor::Client {
        user_id: auth.user.id,
    };
    Ok((conversation, actor))
}

async fn widget_conversation(
    service: &ConversationService,
    visitor_id: Uuid,
) -> Result<(ConversationRow, ChatActor), AppError> {
    let conversation = service
        .find(ConversationKind::Widget, visitor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat session not found".to_string()))?;
    Ok((conversation, ChatActor::Visitor { visitor_id }))
}

// ── Admin ────────────────────────────────────────────────────────────────────

/// GET /api/v1/chat/conversations
pub async fn handle_list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ConversationQuery>,
) -> Result<Json<Vec<ConversationRow>>, AppError> {
    admin_actor(&auth)?;
    let kind = match params.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(raw) => Some(ConversationKind::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("Unknown conversation kind '{raw}'"))
        })?),
        None => None,
    };
    let service = ConversationService::from_state(&state);
    Ok(Json(service.list(kind).await?))
}

/// GET /api/v1/chat/conversations/:id/messages
pub async fn handle_admin_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ThreadResponse>, AppError> {
    let actor = admin_actor(&auth)?;
    let service = ConversationService::from_state(&state);
    let conversation = service.get(id).await?;
    Ok(Json(thread(&service, conversation, &actor).await?))
}

/// POST /api/v1/chat/conversations/:id/messages
pub async fn handle_admin_send(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageRequest>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    let actor = admin_actor(&auth)?;
    let service = ConversationService::from_state(&state);
    let conversation = service.get(id).await?;
    let message = service.send(&conversation, &actor, &body.text, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PATCH /api/v1/chat/conversations/:id/messages/:message_id
pub async fn handle_admin_edit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageRow>, AppError> {
    let actor = admin_actor(&auth)?;
    let service = ConversationService::from_state(&state);
    Ok(Json(
        service
            .edit(id, message_id, &actor, &body.text, Utc::now())
            .await?,
    ))
}

/// DELETE /api/v1/chat/conversations/:id/messages/:message_id
pub async fn handle_admin_delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageRow>, AppError> {
    let actor = admin_actor(&auth)?;
    let service = ConversationService::from_state(&state);
    Ok(Json(
        service
            .delete_message(id, message_id, &actor, Utc::now())
            .await?,
    ))
}

/// POST /api/v1/chat/conversations/:id/read
pub async fn handle_admin_mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationRow>, AppError> {
    let actor = admin_actor(&auth)?;
    let service = ConversationService::from_state(&state);
    Ok(Json(service.mark_read(id, &actor).await?))
}

/// DELETE /api/v1/chat/conversations/:id
pub async fn handle_delete_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_actor(&auth)?;
    let service = ConversationService::from_state(&state);
    service.delete_conversation(id).await?;
    info!("User {} deleted conversation {id}", auth.user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/chat/events
pub async fn handle_admin_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    admin_actor(&auth)?;
    Ok(event_stream(&state.chat_events, None))
}

// ── Client portal ────────────────────────────────────────────────────────────

/// GET /api/v1/me/conversation
pub async fn handle_my_thread(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ThreadResponse>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = client_conversation(&service, &auth).await?;
    Ok(Json(thread(&service, conversation, &actor).await?))
}

/// POST /api/v1/me/conversation/messages
pub async fn handle_my_send(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MessageRequest>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = client_conversation(&service, &auth).await?;
    let message = service.send(&conversation, &actor, &body.text, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PATCH /api/v1/me/conversation/messages/:message_id
pub async fn handle_my_edit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageRow>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = client_conversation(&service, &auth).await?;
    Ok(Json(
        service
            .edit(conversation.id, message_id, &actor, &body.text, Utc::now())
            .await?,
    ))
}

/// DELETE /api/v1/me/conversation/messages/:message_id
pub async fn handle_my_delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageRow>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = client_conversation(&service, &auth).await?;
    Ok(Json(
        service
            .delete_message(conversation.id, message_id, &actor, Utc::now())
            .await?,
    ))
}

/// POST /api/v1/me/conversation/read
pub async fn handle_my_mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ConversationRow>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = client_conversation(&service, &auth).await?;
    Ok(Json(service.mark_read(conversation.id, &actor).await?))
}

/// GET /api/v1/me/conversation/events
pub async fn handle_my_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, _) = client_conversation(&service, &auth).await?;
    Ok(event_stream(&state.chat_events, Some(conversation.id)))
}

// ── Site widget ──────────────────────────────────────────────────────────────

/// POST /api/v1/chat/widget/sessions
///
/// Resumes the session for a known `visitor_id`; anything else starts a new one
/// under a server-issued id.
pub async fn handle_start_widget_session(
    State(state): State<AppState>,
    Json(body): Json<WidgetSessionRequest>,
) -> Result<(StatusCode, Json<WidgetSessionResponse>), AppError> {
    let service = ConversationService::from_state(&state);

    if let Some(visitor_id) = body.visitor_id {
        if let Some(conversation) = service.find(ConversationKind::Widget, visitor_id).await? {
            return Ok((
                StatusCode::OK,
                Json(WidgetSessionResponse {
                    visitor_id,
                    conversation,
                }),
            ));
        }
    }

    let display_name = optional_text(body.display_name.as_deref())
        .unwrap_or_else(|| DEFAULT_VISITOR_NAME.to_string());
    let visitor_id = Uuid::new_v4();
    let conversation = service
        .get_or_create(ConversationKind::Widget, visitor_id, &display_name)
        .await?;

    info!("Widget chat session {} started", conversation.id);
    Ok((
        StatusCode::CREATED,
        Json(WidgetSessionResponse {
            visitor_id,
            conversation,
        }),
    ))
}

/// GET /api/v1/chat/widget/sessions/:visitor_id/messages
pub async fn handle_widget_thread(
    State(state): State<AppState>,
    Path(visitor_id): Path<Uuid>,
) -> Result<Json<ThreadResponse>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = widget_conversation(&service, visitor_id).await?;
    Ok(Json(thread(&service, conversation, &actor).await?))
}

/// POST /api/v1/chat/widget/sessions/:visitor_id/messages
pub async fn handle_widget_send(
    State(state): State<AppState>,
    Path(visitor_id): Path<Uuid>,
    Json(body): Json<MessageRequest>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = widget_conversation(&service, visitor_id).await?;
    let message = service.send(&conversation, &actor, &body.text, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PATCH /api/v1/chat/widget/sessions/:visitor_id/messages/:message_id
pub async fn handle_widget_edit(
    State(state): State<AppState>,
    Path((visitor_id, message_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageRow>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = widget_conversation(&service, visitor_id).await?;
    Ok(Json(
        service
            .edit(conversation.id, message_id, &actor, &body.text, Utc::now())
            .await?,
    ))
}

/// DELETE /api/v1/chat/widget/sessions/:visitor_id/messages/:message_id
pub async fn handle_widget_delete_message(
    State(state): State<AppState>,
    Path((visitor_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageRow>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = widget_conversation(&service, visitor_id).await?;
    Ok(Json(
        service
            .delete_message(conversation.id, message_id, &actor, Utc::now())
            .await?,
    ))
}

/// POST /api/v1/chat/widget/sessions/:visitor_id/read
pub async fn handle_widget_mark_read(
    State(state): State<AppState>,
    Path(visitor_id): Path<Uuid>,
) -> Result<Json<ConversationRow>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, actor) = widget_conversation(&service, visitor_id).await?;
    Ok(Json(service.mark_read(conversation.id, &actor).await?))
}

/// GET /api/v1/chat/widget/sessions/:visitor_id/events
pub async fn handle_widget_events(
    State(state): State<AppState>,
    Path(visitor_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let service = ConversationService::from_state(&state);
    let (conversation, _) = widget_conversation(&service, visitor_id).await?;
    Ok(event_stream(&state.chat_events, Some(conversation.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(actor: &ChatActor, created_at: DateTime<Utc>) -> MessageRow {
        MessageRow {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender: actor.sender_tag().as_str().to_string(),
            sender_id: Some(actor.sender_id()),
            text: "Is Thursday free?".to_string(),
            is_edited: false,
            is_deleted: false,
            created_at,
            edited_at: None,
        }
    }

    #[test]
    fn test_can_modify_only_own_recent_messages() {
        let now = Utc::now();
        let me = ChatActor::Client {
            user_id: Uuid::new_v4(),
        };
        let studio = ChatActor::Admin {
            user_id: Uuid::new_v4(),
        };
        let views = message_views(
            vec![
                message(&me, now - Duration::minutes(10)),
                message(&studio, now - Duration::minutes(1)),
                message(&me, now - Duration::minutes(1)),
            ],
            &me,
            now,
            300,
        );
        let flags: Vec<bool> = views.iter().map(|v| v.can_modify).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_message_view_flattens_row() {
        let actor = ChatActor::Visitor {
            visitor_id: Uuid::new_v4(),
        };
        let views = message_views(vec![message(&actor, Utc::now())], &actor, Utc::now(), 300);
        let json = serde_json::to_value(&views[0]).unwrap();
        assert_eq!(json["sender"], "visitor");
        assert_eq!(json["can_modify"], true);
        assert_eq!(json["text"], "Is Thursday free?");
    }
}
