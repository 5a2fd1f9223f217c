//! Seam between the scheduling agent and the calendar backend.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use roadie_types::{EventDetails, EventPatch};

use crate::error::Result;

/// Calendar operations the agent can perform on the user's behalf.
/// Implementations map backend conflicts to [`RoadieError::Conflict`] so the
/// agent can relay which event is in the way.
///
/// [`RoadieError::Conflict`]: crate::error::RoadieError::Conflict
#[async_trait]
#[cfg_attr(test, automock)]
pub trait CalendarApi: Send + Sync {
    /// Creates an event and returns its backend id.
    async fn create_event(&self, details: EventDetails) -> Result<String>;

    /// Applies a partial update to an existing event.
    async fn update_event(&self, event_id: &str, patch: EventPatch) -> Result<()>;
}
