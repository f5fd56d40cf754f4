// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process event bus for live updates.
//!
//! Writes to the database publish an event; WebSocket subscribers receive
//! them instead of polling. The bus is a broadcast channel, so a slow
//! subscriber can lag and miss events; clients refetch the thread when
//! told they lagged.

use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::{SenderRole, StoredConnection, StoredMessage};

/// Broadcast channel capacity. Lagging subscribers lose oldest events.
const EVENT_CAPACITY: usize = 256;

/// Something observable happened to a thread or a connection.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A message was appended to a thread.
    MessageCreated {
        message_id: Uuid,
        user_id: Uuid,
        creator_id: Uuid,
        sender: SenderRole,
        content: String,
        created_at: chrono::DateTime<chrono::Utc>,
    },
    /// A paid connection was recorded.
    ConnectionCreated {
        user_id: Uuid,
        creator_id: Uuid,
    },
}

impl AppEvent {
    pub fn message_created(message: &StoredMessage) -> Self {
        AppEvent::MessageCreated {
            message_id: message.id,
            user_id: message.user_id,
            creator_id: message.creator_id,
            sender: message.sender,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }

    pub fn connection_created(connection: &StoredConnection) -> Self {
        AppEvent::ConnectionCreated {
            user_id: connection.user_id,
            creator_id: connection.creator_id,
        }
    }

    /// The user/creator pair this event belongs to.
    pub fn pair(&self) -> (Uuid, Uuid) {
        match self {
            AppEvent::MessageCreated {
                user_id, creator_id, ..
            }
            | AppEvent::ConnectionCreated {
                user_id, creator_id,
            } => (*user_id, *creator_id),
        }
    }

    /// Which side produced the event, if it has a side.
    pub fn sender(&self) -> Option<SenderRole> {
        match self {
            AppEvent::MessageCreated { sender, .. } => Some(*sender),
            AppEvent::ConnectionCreated { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish an event. A send with no subscribers is not an error.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_message(user_id: Uuid, creator_id: Uuid) -> StoredMessage {
        StoredMessage {
            id: Uuid::new_v4(),
            user_id,
            creator_id,
            sender: SenderRole::User,
            content: "hi".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let user = Uuid::new_v4();
        let creator = Uuid::new_v4();
        bus.publish(AppEvent::message_created(&sample_message(user, creator)));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.pair(), (user, creator));
        assert_eq!(event.sender(), Some(SenderRole::User));
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(AppEvent::ConnectionCreated {
            user_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
        });
    }
}
