//! REST client for Cloudflare Workers AI model inference.
//!
//! Non-streamed calls come back wrapped in the account API envelope
//! (`result` / `success` / `errors`); streamed calls return the raw
//! server-sent-event body.

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::error::WorkersAiError;

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

pub type ResponseStream = BoxStream<'static, Result<Bytes, WorkersAiError>>;

pub struct WorkersAiClient {
    http: Client,
    account_id: String,
    api_token: SecretString,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl WorkersAiClient {
    pub fn new(account_id: String, api_token: SecretString) -> Self {
        Self::with_base_url(account_id, api_token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(account_id: String, api_token: SecretString, base_url: String) -> Self {
        Self {
            http: Client::new(),
            account_id,
            api_token,
            base_url,
        }
    }

    fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url, self.account_id, model
        )
    }

    /// Invokes a model and returns the parsed `result` payload.
    pub async fn run(&self, model: &str, payload: Value) -> Result<Value, WorkersAiError> {
        tracing::debug!(model, "running model");
        let response = self
            .http
            .post(self.run_url(model))
            .bearer_auth(self.api_token.expose_secret())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let envelope: Envelope = response.json().await?;
        unwrap_envelope(envelope)
    }

    /// Invokes a model expecting a streamed reply and hands back the raw
    /// body chunks. The caller pairs this with `"stream": true` in the
    /// payload; streamed responses bypass the envelope entirely.
    pub async fn run_streamed(
        &self,
        model: &str,
        payload: Value,
    ) -> Result<ResponseStream, WorkersAiError> {
        tracing::debug!(model, "running model (streamed)");
        let response = self
            .http
            .post(self.run_url(model))
            .bearer_auth(self.api_token.expose_secret())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(response
            .bytes_stream()
            .map_err(WorkersAiError::from)
            .boxed())
    }

    /// Runs a speech-to-text model over one audio unit. The model wants the
    /// bytes as a plain number array in JSON.
    pub async fn transcribe(&self, model: &str, audio: &[u8]) -> Result<String, WorkersAiError> {
        let result = self
            .run(model, serde_json::json!({ "audio": audio }))
            .await?;
        text_field(&result)
    }
}

fn unwrap_envelope(envelope: Envelope) -> Result<Value, WorkersAiError> {
    if !envelope.success {
        let detail = envelope
            .errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(WorkersAiError::Api(if detail.is_empty() {
            "request was not successful".to_string()
        } else {
            detail
        }));
    }
    envelope
        .result
        .ok_or(WorkersAiError::MissingField("result"))
}

fn text_field(result: &Value) -> Result<String, WorkersAiError> {
    result
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(WorkersAiError::MissingField("text"))
}
