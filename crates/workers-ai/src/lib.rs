mod client;
mod error;

pub use client::{ResponseStream, WorkersAiClient};
pub use error::WorkersAiError;
