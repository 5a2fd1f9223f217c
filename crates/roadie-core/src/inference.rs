//! Seams between the coordinator and the model backends.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
#[cfg(test)]
use mockall::automock;
use roadie_types::Interaction;
use serde_json::Value;

use crate::error::Result;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw body chunks from a streamed inference call. Chunk boundaries carry
/// no meaning; consumers must reassemble lines themselves.
pub type ByteStream = BoxStream<'static, std::result::Result<bytes::Bytes, BoxError>>;

/// Turns a binary audio unit into text.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Produces the assistant reply for an interaction's full history. The
/// implementation decides how many model and tool calls that takes.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait ResponseGenerator: Send + Sync {
    async fn respond(&self, interaction: &Interaction) -> Result<String>;
}

/// Low-level model invocation, one call per request. `run` returns the
/// parsed result payload; `run_streamed` hands back the raw byte stream.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait InferenceApi: Send + Sync {
    async fn run(&self, model: &str, payload: Value) -> Result<Value>;

    async fn run_streamed(&self, model: &str, payload: Value) -> Result<ByteStream>;
}
