//! Adapters mapping the Workers AI client onto the coordinator's model
//! seams.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use roadie_core::error::{Result, RoadieError};
use roadie_core::inference::{BoxError, ByteStream, InferenceApi, Transcriber};
use serde_json::Value;
use workers_ai::{WorkersAiClient, WorkersAiError};

pub struct WorkersAiTranscriber {
    client: Arc<WorkersAiClient>,
    model: String,
}

impl WorkersAiTranscriber {
    pub fn new(client: Arc<WorkersAiClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl Transcriber for WorkersAiTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.client
            .transcribe(&self.model, audio)
            .await
            .map_err(|e| RoadieError::transcription(e.to_string()))
    }
}

pub struct WorkersAiInference {
    client: Arc<WorkersAiClient>,
}

impl WorkersAiInference {
    pub fn new(client: Arc<WorkersAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InferenceApi for WorkersAiInference {
    async fn run(&self, model: &str, payload: Value) -> Result<Value> {
        self.client.run(model, payload).await.map_err(into_internal)
    }

    async fn run_streamed(&self, model: &str, payload: Value) -> Result<ByteStream> {
        let stream = self
            .client
            .run_streamed(model, payload)
            .await
            .map_err(into_internal)?;
        Ok(stream
            .map(|chunk| chunk.map_err(|e| Box::new(e) as BoxError))
            .boxed())
    }
}

fn into_internal(e: WorkersAiError) -> RoadieError {
    RoadieError::internal(e.to_string())
}
