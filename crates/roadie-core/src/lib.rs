pub mod agent;
pub mod calendar;
pub mod coordinator;
pub mod error;
pub mod hub;
pub mod inference;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use coordinator::{Coordinator, CoordinatorHandle};
pub use error::{AgentFault, PipelineStage, Result, RoadieError};
