//! Error types for the coordinator and its collaborators.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = RoadieError> = std::result::Result<T, E>;

// Stable error codes, one per kind. Logged alongside failures and usable
// by clients that want to branch without parsing messages.
pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
pub const TRANSCRIPTION_FAILED: &str = "TRANSCRIPTION_FAILED";
pub const LLM_FAILED: &str = "LLM_FAILED";
pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
pub const CALENDAR_API_ERROR: &str = "CALENDAR_API_ERROR";
pub const CONFLICT_DETECTED: &str = "CONFLICT_DETECTED";
pub const TIMEOUT: &str = "TIMEOUT";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// The one error type shared across the coordinator, its pipeline, and the
/// collaborator seams. Call sites branch on the kind, never on a type
/// hierarchy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoadieError {
    /// Malformed request shape (bad path segment, bad tool arguments).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The transcription collaborator rejected or failed on the audio.
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Generation failed. The fault records where inside the agent the
    /// failure arose; callers treat every fault as the same kind.
    #[error("agent failure: {message}")]
    Agent { fault: AgentFault, message: String },

    /// Storage failure, including malformed persisted rows.
    #[error("database error: {0}")]
    Database(String),

    /// The calendar collaborator failed.
    #[error("calendar api error: {0}")]
    CalendarApi(String),

    /// The calendar collaborator reported a conflicting event.
    #[error("scheduling conflict with event '{event_id}': {message}")]
    Conflict { event_id: String, message: String },

    /// A pipeline stage exceeded its deadline.
    #[error("{stage} timed out after {timeout:?}")]
    Timeout {
        stage: PipelineStage,
        timeout: Duration,
    },

    /// Infrastructure fault, e.g. an unreachable actor mailbox.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Where inside the agent a generation failure arose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFault {
    /// The model response or stream had an unexpected shape.
    IntentDetermination,
    /// The generation call itself failed.
    Execution,
    /// The assembled response failed a sanity check.
    Validation,
}

/// The two suspending stages that run under a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Transcription,
    Generation,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Transcription => write!(f, "transcription"),
            PipelineStage::Generation => write!(f, "generation"),
        }
    }
}

impl RoadieError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transcription(message: impl Into<String>) -> Self {
        Self::Transcription(message.into())
    }

    pub fn agent(fault: AgentFault, message: impl Into<String>) -> Self {
        Self::Agent {
            fault,
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn calendar_api(message: impl Into<String>) -> Self {
        Self::CalendarApi(message.into())
    }

    pub fn conflict(event_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            event_id: event_id.into(),
            message: message.into(),
        }
    }

    pub fn timeout(stage: PipelineStage, timeout: Duration) -> Self {
        Self::Timeout { stage, timeout }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The stable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            RoadieError::Validation(_) => INVALID_MESSAGE,
            RoadieError::Transcription(_) => TRANSCRIPTION_FAILED,
            RoadieError::Agent { .. } => LLM_FAILED,
            RoadieError::Database(_) => DATABASE_ERROR,
            RoadieError::CalendarApi(_) => CALENDAR_API_ERROR,
            RoadieError::Conflict { .. } => CONFLICT_DETECTED,
            RoadieError::Timeout { .. } => TIMEOUT,
            RoadieError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl From<sqlx::Error> for RoadieError {
    fn from(err: sqlx::Error) -> Self {
        RoadieError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_kinds() {
        assert_eq!(RoadieError::validation("x").code(), INVALID_MESSAGE);
        assert_eq!(RoadieError::transcription("x").code(), TRANSCRIPTION_FAILED);
        assert_eq!(
            RoadieError::agent(AgentFault::Execution, "x").code(),
            LLM_FAILED
        );
        assert_eq!(RoadieError::database("x").code(), DATABASE_ERROR);
        assert_eq!(RoadieError::calendar_api("x").code(), CALENDAR_API_ERROR);
        assert_eq!(RoadieError::conflict("e1", "busy").code(), CONFLICT_DETECTED);
        assert_eq!(
            RoadieError::timeout(PipelineStage::Generation, Duration::from_secs(1)).code(),
            TIMEOUT
        );
        assert_eq!(RoadieError::internal("x").code(), INTERNAL_ERROR);
    }

    #[test]
    fn timeout_display_names_the_stage() {
        let err = RoadieError::timeout(PipelineStage::Transcription, Duration::from_secs(30));
        assert!(err.to_string().contains("transcription timed out"));
    }
}
