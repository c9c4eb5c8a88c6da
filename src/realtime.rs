//! Live fan-out of board events to connected clients.
//!
//! Every user id owns one broadcast group; each open socket of that user holds
//! a receiver. Delivery is fire-and-forget: a user with no open socket misses
//! the event and relies on persisted history instead.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{ApplicationStatus, ConnectionStatus, Message, PublicUser};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionNotice {
    pub connection_id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: ConnectionStatus,
    pub from: Option<PublicUser>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationNotice {
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    ConnectionRequest(ConnectionNotice),
    ConnectionResponded(ConnectionNotice),
    ReceiveMessage(Message),
    MessageSent(Message),
    ApplicationReceived(ApplicationNotice),
    ApplicationWithdrawn(ApplicationNotice),
    ApplicationStatus(ApplicationNotice),
}

impl RealtimeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::ConnectionRequest(_) => "connection-request",
            RealtimeEvent::ConnectionResponded(_) => "connection-responded",
            RealtimeEvent::ReceiveMessage(_) => "receive-message",
            RealtimeEvent::MessageSent(_) => "message-sent",
            RealtimeEvent::ApplicationReceived(_) => "application-received",
            RealtimeEvent::ApplicationWithdrawn(_) => "application-withdrawn",
            RealtimeEvent::ApplicationStatus(_) => "application-status",
        }
    }
}

#[derive(Clone)]
pub struct RealtimeHub {
    groups: Arc<Mutex<HashMap<Uuid, broadcast::Sender<RealtimeEvent>>>>,
    capacity: usize,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn groups(&self) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<RealtimeEvent>>> {
        self.groups
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds one connection to the user's group.
    pub fn join(&self, user_id: Uuid) -> broadcast::Receiver<RealtimeEvent> {
        let mut groups = self.groups();
        match groups.get(&user_id) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                groups.insert(user_id, sender);
                receiver
            }
        }
    }

    /// Drops the user's group once its last receiver is gone.
    pub fn leave(&self, user_id: Uuid) {
        let mut groups = self.groups();
        if groups
            .get(&user_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            groups.remove(&user_id);
        }
    }

    /// Returns how many live connections received the event.
    pub fn emit(&self, user_id: Uuid, event: RealtimeEvent) -> usize {
        let mut groups = self.groups();
        let Some(sender) = groups.get(&user_id) else {
            tracing::debug!(user_id = %user_id, event = event.name(), "no live connection");
            return 0;
        };
        match sender.send(event) {
            Ok(delivered) => delivered,
            Err(_) => {
                groups.remove(&user_id);
                0
            }
        }
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.groups()
            .get(&user_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(64)
    }
}
