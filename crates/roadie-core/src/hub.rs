//! Event fan-out to attached connections.
//!
//! Frames are serialized once per event and cloned per recipient. Delivery
//! is fire-and-forget: a slow or gone socket is logged and skipped, it never
//! stalls the actor or affects the other connections.

use roadie_types::ServerEvent;

use crate::error::{Result, RoadieError};
use crate::registry::{ConnectionHandle, SessionRegistry};

/// Sends `event` to every attached connection.
pub fn broadcast(registry: &SessionRegistry, event: &ServerEvent) -> Result<()> {
    let frame = serialize(event)?;
    for conn in registry.connections() {
        deliver(conn, frame.clone());
    }
    Ok(())
}

/// Sends `event` to a single connection.
pub fn notify(conn: &ConnectionHandle, event: &ServerEvent) -> Result<()> {
    deliver(conn, serialize(event)?);
    Ok(())
}

fn serialize(event: &ServerEvent) -> Result<String> {
    serde_json::to_string(event)
        .map_err(|e| RoadieError::internal(format!("failed to serialize event: {e}")))
}

fn deliver(conn: &ConnectionHandle, frame: String) {
    if let Err(e) = conn.enqueue(frame) {
        tracing::warn!(connection_id = %conn.id(), error = %e, "dropping outbound event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadie_types::{Role, ServerEvent};
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::registry::ConnectionId;

    fn attach(registry: &mut SessionRegistry) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(8);
        let conn = ConnectionHandle::new(ConnectionId::new(), tx);
        registry.register(conn, "interaction-1".to_string());
        rx
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        // Arrange
        let mut registry = SessionRegistry::new();
        let mut rx_a = attach(&mut registry);
        let mut rx_b = attach(&mut registry);
        let event = ServerEvent::error("boom");

        // Act
        broadcast(&registry, &event).unwrap();

        // Assert
        let frame_a = rx_a.recv().await.unwrap();
        let frame_b = rx_b.recv().await.unwrap();
        assert_eq!(frame_a, frame_b);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&frame_a).unwrap(),
            json!({"type": "error", "message": "boom"})
        );
    }

    #[tokio::test]
    async fn broadcast_skips_closed_connections() {
        // Arrange
        let mut registry = SessionRegistry::new();
        let rx_gone = attach(&mut registry);
        let mut rx_live = attach(&mut registry);
        drop(rx_gone);

        // Act
        broadcast(&registry, &ServerEvent::error("boom")).unwrap();

        // Assert: the live side still got its frame.
        assert!(rx_live.recv().await.is_some());
    }

    #[tokio::test]
    async fn processing_placeholder_has_no_content_or_timestamp_keys() {
        // Arrange
        let (tx, mut rx) = mpsc::channel(8);
        let conn = ConnectionHandle::new(ConnectionId::new(), tx);
        let event = ServerEvent::processing(Role::User, "m-1", "i-1");

        // Act
        notify(&conn, &event).unwrap();

        // Assert: the placeholder wire shape is exact, absent fields are
        // omitted rather than null.
        let frame = rx.recv().await.unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&frame).unwrap(),
            json!({
                "type": "message",
                "status": "processing",
                "role": "user",
                "messageId": "m-1",
                "interactionId": "i-1",
            })
        );
    }

    #[tokio::test]
    async fn final_message_event_carries_content_and_timestamp() {
        // Arrange
        let (tx, mut rx) = mpsc::channel(8);
        let conn = ConnectionHandle::new(ConnectionId::new(), tx);
        let message = roadie_types::Message {
            message_id: "m-1".to_string(),
            interaction_id: "i-1".to_string(),
            role: Role::Assistant,
            content: "booked it".to_string(),
            timestamp: 42,
        };

        // Act
        notify(&conn, &ServerEvent::message(&message)).unwrap();

        // Assert
        let frame = rx.recv().await.unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&frame).unwrap(),
            json!({
                "type": "message",
                "role": "assistant",
                "messageId": "m-1",
                "interactionId": "i-1",
                "content": "booked it",
                "timestamp": 42,
            })
        );
    }
}
