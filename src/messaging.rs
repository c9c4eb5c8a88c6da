//! Chat between accepted connections.

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    connections,
    error::{BoardError, BoardResult},
    models::{Message, NewMessage},
    realtime::{RealtimeEvent, RealtimeHub},
    store::Store,
};

pub const DEFAULT_PAGE: usize = 50;
pub const MAX_PAGE: usize = 200;

/// Up to `limit` messages with `other_id` older than `before`, oldest first.
pub async fn list(
    store: &dyn Store,
    user: &AuthenticatedUser,
    other_id: Uuid,
    limit: Option<usize>,
    before: Option<NaiveDateTime>,
) -> BoardResult<Vec<Message>> {
    if !connections::are_connected(store, user.user_id, other_id).await? {
        return Err(BoardError::forbidden("You must be connected to view messages."));
    }
    let limit = limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    Ok(store
        .list_messages_between(user.user_id, other_id, limit, before)
        .await?)
}

pub async fn send(
    store: &dyn Store,
    hub: &RealtimeHub,
    user: &AuthenticatedUser,
    other_id: Uuid,
    content: &str,
) -> BoardResult<Message> {
    if !connections::are_connected(store, user.user_id, other_id).await? {
        return Err(BoardError::forbidden("You must be connected to chat."));
    }
    if content.trim().is_empty() {
        return Err(BoardError::validation("Message content required."));
    }

    let message = store
        .insert_message(NewMessage {
            id: Uuid::new_v4(),
            sender_id: user.user_id,
            receiver_id: other_id,
            content: content.to_string(),
        })
        .await?;

    let delivered = hub.emit(other_id, RealtimeEvent::ReceiveMessage(message.clone()));
    hub.emit(user.user_id, RealtimeEvent::MessageSent(message.clone()));
    info!(
        message_id = %message.id,
        user_id = %user.user_id,
        receiver_id = %other_id,
        delivered,
        "message sent"
    );
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connections::tests::{connect, member},
        models::Role,
        store::MemoryStore,
    };

    #[tokio::test]
    async fn strangers_cannot_chat_whatever_the_payload() {
        let store = MemoryStore::new();
        let hub = RealtimeHub::new(4);
        let a = member(&store, "Alice", Role::JobSeeker).await;
        let b = member(&store, "Bob", Role::Employer).await;

        let err = send(&store, &hub, &a, b.user_id, "hello").await.unwrap_err();
        assert!(matches!(err, BoardError::Forbidden(_)));
        assert_eq!(err.to_string(), "You must be connected to chat.");
        let err = send(&store, &hub, &a, b.user_id, "   ").await.unwrap_err();
        assert!(matches!(err, BoardError::Forbidden(_)));
        let err = list(&store, &a, b.user_id, None, None).await.unwrap_err();
        assert_eq!(err.to_string(), "You must be connected to view messages.");
    }

    #[tokio::test]
    async fn connected_users_exchange_messages_and_both_sides_hear_it() {
        let store = MemoryStore::new();
        let hub = RealtimeHub::new(4);
        let a = member(&store, "Alice", Role::JobSeeker).await;
        let b = member(&store, "Bob", Role::Employer).await;
        connect(&store, &a, &b).await;

        let mut a_events = hub.join(a.user_id);
        let mut b_events = hub.join(b.user_id);

        let err = send(&store, &hub, &a, b.user_id, " \n").await.unwrap_err();
        assert_eq!(err.to_string(), "Message content required.");

        let sent = send(&store, &hub, &a, b.user_id, "hello").await.expect("send");
        send(&store, &hub, &b, a.user_id, "hi back").await.expect("reply");

        match b_events.recv().await.expect("b event") {
            RealtimeEvent::ReceiveMessage(message) => assert_eq!(message.id, sent.id),
            other => panic!("unexpected event {}", other.name()),
        }
        assert_eq!(a_events.recv().await.expect("a event").name(), "message-sent");

        let history = list(&store, &b, a.user_id, None, None).await.expect("history");
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "hi back"]);

        let page = list(&store, &b, a.user_id, Some(0), None).await.expect("page");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].content, "hi back");
    }

    #[tokio::test]
    async fn before_cursor_pages_backwards_oldest_first() {
        let store = MemoryStore::new();
        let hub = RealtimeHub::new(16);
        let a = member(&store, "Alice", Role::JobSeeker).await;
        let b = member(&store, "Bob", Role::Employer).await;
        connect(&store, &a, &b).await;

        let mut sent = Vec::new();
        for n in 1..=5 {
            let message = send(&store, &hub, &a, b.user_id, &format!("m{n}"))
                .await
                .expect("send");
            sent.push(message);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let cursor = sent[2].created_at;
        let older = list(&store, &b, a.user_id, None, Some(cursor)).await.expect("older");
        let contents: Vec<&str> = older.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);

        let newest_older = list(&store, &b, a.user_id, Some(1), Some(cursor))
            .await
            .expect("page");
        assert_eq!(newest_older.len(), 1);
        assert_eq!(newest_older[0].content, "m2");
    }
}
