use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::models::chat::{ConversationRow, MessageRow};

pub const CHANNEL_CAPACITY: usize = 256;
const KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatEventKind {
    MessageCreated,
    MessageUpdated,
    MessageDeleted,
    ConversationRead,
    ConversationDeleted,
}

/// One chat mutation, carrying the refreshed sidebar metadata when it still exists.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEvent {
    pub kind: ChatEventKind,
    pub conversation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRow>,
}

pub fn channel() -> broadcast::Sender<ChatEvent> {
    let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
    tx
}

/// No subscribers is the normal idle state, not an error.
pub fn publish(events: &broadcast::Sender<ChatEvent>, event: ChatEvent) {
    let receivers = events.send(event).unwrap_or(0);
    tracing::debug!(receivers, "chat event published");
}

fn to_sse(event: &ChatEvent) -> Option<Event> {
    Event::default().event("chat").json_data(event).ok()
}

/// SSE stream of chat events, optionally narrowed to a single conversation.
/// Lagged receivers skip what they missed; clients refetch on reconnect.
pub fn event_stream(
    events: &broadcast::Sender<ChatEvent>,
    only: Option<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(events.subscribe()).filter_map(move |result| {
        let event = result.ok()?;
        if only.is_some_and(|id| id != event.conversation_id) {
            return None;
        }
        to_sse(&event).map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(conversation_id: Uuid) -> ChatEvent {
        ChatEvent {
            kind: ChatEventKind::ConversationRead,
            conversation_id,
            conversation: None,
            message: None,
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let tx = channel();
        publish(&tx, event(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let tx = channel();
        let mut rx = tx.subscribe();
        let id = Uuid::new_v4();
        publish(&tx, event(id));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.conversation_id, id);
        assert_eq!(received.kind, ChatEventKind::ConversationRead);
    }

    #[test]
    fn test_event_serializes_without_empty_fields() {
        let json = serde_json::to_value(event(Uuid::nil())).unwrap();
        assert_eq!(json["kind"], "conversation_read");
        assert!(json.get("message").is_none());
    }
}
