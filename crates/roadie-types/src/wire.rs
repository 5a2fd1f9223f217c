use crate::interaction::{Interaction, Message, Role};

/// Server-to-client frames, serialized as JSON text with a `type` tag.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "interaction_details")]
    InteractionDetails { data: Interaction },
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(rename = "error")]
    Error { message: String },
}

/// Payload of a `message` frame. A placeholder carries `status: processing`
/// and no content; a persisted message carries content and timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcessingStatus>,
    pub role: Role,
    pub message_id: String,
    pub interaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProcessingStatus {
    #[serde(rename = "processing")]
    Processing,
}

impl ServerEvent {
    pub fn interaction_details(interaction: Interaction) -> Self {
        ServerEvent::InteractionDetails { data: interaction }
    }

    /// Placeholder announcing that a message is being produced.
    pub fn processing(role: Role, message_id: &str, interaction_id: &str) -> Self {
        ServerEvent::Message(MessageEvent {
            status: Some(ProcessingStatus::Processing),
            role,
            message_id: message_id.to_string(),
            interaction_id: interaction_id.to_string(),
            content: None,
            timestamp: None,
        })
    }

    pub fn message(message: &Message) -> Self {
        ServerEvent::Message(MessageEvent {
            status: None,
            role: message.role,
            message_id: message.message_id.clone(),
            interaction_id: message.interaction_id.clone(),
            content: Some(message.content.clone()),
            timestamp: Some(message.timestamp),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
