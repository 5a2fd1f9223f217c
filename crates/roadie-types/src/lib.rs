pub mod calendar;
pub mod interaction;
pub mod tools;
pub mod wire;

pub use calendar::{EventDetails, EventPatch, EventTime};
pub use interaction::{Interaction, InteractionStatus, InteractionSummary, Message, Role};
pub use tools::{ToolCall, ToolSpec};
pub use wire::{MessageEvent, ProcessingStatus, ServerEvent};
