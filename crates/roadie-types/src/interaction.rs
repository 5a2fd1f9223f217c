/// The role of the message sender: "user", "assistant", "system"
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// Lifecycle label stored with an interaction. Set to `Created` when the
/// interaction is created; no later transition is performed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InteractionStatus {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl InteractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionStatus::Created => "created",
            InteractionStatus::Pending => "pending",
            InteractionStatus::InProgress => "in_progress",
            InteractionStatus::Completed => "completed",
            InteractionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(InteractionStatus::Created),
            "pending" => Some(InteractionStatus::Pending),
            "in_progress" => Some(InteractionStatus::InProgress),
            "completed" => Some(InteractionStatus::Completed),
            "cancelled" => Some(InteractionStatus::Cancelled),
            _ => None,
        }
    }
}

/// One persisted conversation turn. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub interaction_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: i64,
}

/// A conversation with its full ordered message history.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub interaction_id: String,
    pub status: InteractionStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub messages: Vec<Message>,
}

/// Listing shape: interaction metadata without the message history.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSummary {
    pub interaction_id: String,
    pub status: InteractionStatus,
    pub created_at: i64,
    pub updated_at: i64,
}
