//! Tool-calling scheduling agent.
//!
//! Generation runs in two phases. A bounded tool loop lets the model request
//! calendar operations; every outcome, success or failure, is fed back as a
//! `tool` message so the model can react. Once the model stops asking for
//! tools, a final streamed call produces the reply text.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use roadie_types::{EventDetails, EventPatch, EventTime, Interaction, ToolCall, ToolSpec};
use serde_json::{Value, json};

use crate::calendar::CalendarApi;
use crate::error::{AgentFault, Result, RoadieError};
use crate::inference::{ByteStream, InferenceApi, ResponseGenerator};

/// How many times the model may request tools for one reply before the
/// agent gives up.
const MAX_TOOL_ROUNDS: usize = 4;

const SYSTEM_PREAMBLE: &str = "You are Roadie, the scheduling assistant for a touring band's \
    manager. You keep the band calendar: rehearsals, gigs, travel, and interviews. Use \
    create_calendar_event to put new engagements on the calendar and update_calendar_event to \
    change ones you already created. Ask for any missing detail instead of guessing. Replies \
    are read aloud, so keep them short and conversational.";

/// The tools the agent exposes to the model. Fixed at compile time;
/// dispatch happens by name in [`SchedulingAgent::run_tool`].
pub fn calendar_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "create_calendar_event".to_string(),
            "Create a new event on the band calendar. Use this when the user wants to \
             schedule a rehearsal, gig, or other engagement."
                .to_string(),
            json!({
                "type": "object",
                "properties": {
                    "summary": { "type": "string", "description": "Short title for the event" },
                    "description": { "type": "string", "description": "Longer notes about the event" },
                    "startDateTime": { "type": "string", "description": "Event start in RFC 3339 format" },
                    "startTimeZone": { "type": "string", "description": "IANA time zone of the start" },
                    "endDateTime": { "type": "string", "description": "Event end in RFC 3339 format" },
                    "endTimeZone": { "type": "string", "description": "IANA time zone of the end" },
                    "location": { "type": "string", "description": "Where the event takes place" }
                },
                "required": ["summary", "startDateTime", "endDateTime"]
            }),
        ),
        ToolSpec::new(
            "update_calendar_event".to_string(),
            "Update an existing event on the band calendar. Requires the event id returned \
             when the event was created."
                .to_string(),
            json!({
                "type": "object",
                "properties": {
                    "eventId": { "type": "string", "description": "Identifier of the event to change" },
                    "summary": { "type": "string" },
                    "description": { "type": "string" },
                    "startDateTime": { "type": "string" },
                    "startTimeZone": { "type": "string" },
                    "endDateTime": { "type": "string" },
                    "endTimeZone": { "type": "string" },
                    "location": { "type": "string" }
                },
                "required": ["eventId"]
            }),
        ),
    ]
}

pub struct SchedulingAgent {
    ai: Arc<dyn InferenceApi>,
    calendar: Arc<dyn CalendarApi>,
    model: String,
    tools: Vec<ToolSpec>,
}

impl SchedulingAgent {
    pub fn new(ai: Arc<dyn InferenceApi>, calendar: Arc<dyn CalendarApi>, model: String) -> Self {
        Self {
            ai,
            calendar,
            model,
            tools: calendar_tools(),
        }
    }

    /// Executes one tool call. Failures are returned, not raised past the
    /// caller; the loop folds them into a `success: false` outcome for the
    /// model.
    async fn run_tool(&self, call: &ToolCall) -> Result<Value> {
        match call.name.as_str() {
            "create_calendar_event" => {
                let details = parse_event_details(&call.arguments)?;
                let event_id = self.calendar.create_event(details).await?;
                Ok(json!({ "eventId": event_id }))
            }
            "update_calendar_event" => {
                let event_id = required_str(&call.arguments, "eventId")?;
                let patch = parse_event_patch(&call.arguments);
                self.calendar.update_event(&event_id, patch).await?;
                Ok(json!({ "eventId": event_id }))
            }
            other => Err(RoadieError::validation(format!("unknown tool '{other}'"))),
        }
    }

    /// Final streamed call, issued once the model has no more tool requests.
    async fn finish(&self, messages: Vec<Value>) -> Result<String> {
        let stream = self
            .ai
            .run_streamed(&self.model, json!({ "messages": messages, "stream": true }))
            .await
            .map_err(as_agent_failure)?;
        collect_streamed_text(stream).await
    }
}

#[async_trait]
impl ResponseGenerator for SchedulingAgent {
    async fn respond(&self, interaction: &Interaction) -> Result<String> {
        let mut messages = conversation_messages(interaction);

        for _ in 0..MAX_TOOL_ROUNDS {
            let result = self
                .ai
                .run(
                    &self.model,
                    json!({ "messages": &messages, "tools": &self.tools }),
                )
                .await
                .map_err(as_agent_failure)?;

            let calls = parse_tool_calls(&result)?;
            if calls.is_empty() {
                return self.finish(messages).await;
            }

            for call in calls {
                let outcome = tool_outcome(self.run_tool(&call).await);
                tracing::debug!(tool = %call.name, outcome = %outcome, "tool call settled");
                messages.push(json!({
                    "role": "tool",
                    "name": call.name,
                    "content": outcome.to_string(),
                }));
            }
        }

        Err(RoadieError::agent(
            AgentFault::Execution,
            format!("model kept requesting tools after {MAX_TOOL_ROUNDS} rounds"),
        ))
    }
}

fn conversation_messages(interaction: &Interaction) -> Vec<Value> {
    let mut messages = Vec::with_capacity(interaction.messages.len() + 1);
    messages.push(json!({ "role": "system", "content": SYSTEM_PREAMBLE }));
    for message in &interaction.messages {
        messages.push(json!({
            "role": message.role.as_str(),
            "content": message.content,
        }));
    }
    messages
}

/// Missing and null `tool_calls` both mean "no tools requested". Anything
/// else must parse as a list of named calls.
fn parse_tool_calls(result: &Value) -> Result<Vec<ToolCall>> {
    let Some(raw) = result.get("tool_calls") else {
        return Ok(Vec::new());
    };
    if raw.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(raw.clone()).map_err(|e| {
        RoadieError::agent(
            AgentFault::IntentDetermination,
            format!("malformed tool call payload: {e}"),
        )
    })
}

fn tool_outcome(result: Result<Value>) -> Value {
    match result {
        Ok(data) => json!({ "success": true, "data": data }),
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    }
}

fn parse_event_details(args: &Value) -> Result<EventDetails> {
    Ok(EventDetails {
        summary: required_str(args, "summary")?,
        description: optional_str(args, "description"),
        start: EventTime::new(
            required_str(args, "startDateTime")?,
            optional_str(args, "startTimeZone"),
        ),
        end: EventTime::new(
            required_str(args, "endDateTime")?,
            optional_str(args, "endTimeZone"),
        ),
        location: optional_str(args, "location"),
    })
}

fn parse_event_patch(args: &Value) -> EventPatch {
    EventPatch {
        summary: optional_str(args, "summary"),
        description: optional_str(args, "description"),
        start: optional_str(args, "startDateTime")
            .map(|d| EventTime::new(d, optional_str(args, "startTimeZone"))),
        end: optional_str(args, "endDateTime")
            .map(|d| EventTime::new(d, optional_str(args, "endTimeZone"))),
        location: optional_str(args, "location"),
    }
}

fn required_str(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RoadieError::validation(format!("tool argument '{key}' is required")))
}

fn optional_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Keeps pre-classified agent faults, wraps transport and backend failures
/// as execution faults.
fn as_agent_failure(e: RoadieError) -> RoadieError {
    match e {
        RoadieError::Agent { .. } => e,
        other => RoadieError::agent(AgentFault::Execution, other.to_string()),
    }
}

/// Reassembles server-sent event lines from raw chunks and concatenates the
/// `response` fragments. Chunk boundaries can land anywhere, including in
/// the middle of a JSON frame or a multi-byte character, so splitting is
/// done on raw bytes and decoding per complete line.
async fn collect_streamed_text(mut stream: ByteStream) -> Result<String> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut text = String::new();
    let mut saw_data = false;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            RoadieError::agent(AgentFault::Execution, format!("response stream failed: {e}"))
        })?;
        buffer.extend_from_slice(&chunk);
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            consume_line(&line[..line.len() - 1], &mut text, &mut saw_data)?;
        }
    }
    if !buffer.is_empty() {
        let line = std::mem::take(&mut buffer);
        consume_line(&line, &mut text, &mut saw_data)?;
    }

    if !saw_data {
        return Err(RoadieError::agent(
            AgentFault::IntentDetermination,
            "stream ended without any data frames",
        ));
    }
    let text = collapse_newlines(&text);
    if text.is_empty() {
        return Err(RoadieError::agent(
            AgentFault::Validation,
            "model returned an empty response",
        ));
    }
    Ok(text)
}

fn consume_line(raw: &[u8], text: &mut String, saw_data: &mut bool) -> Result<()> {
    let line = String::from_utf8_lossy(raw);
    let Some(payload) = line.trim().strip_prefix("data:") else {
        return Ok(());
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(());
    }
    if payload == "[DONE]" {
        *saw_data = true;
        return Ok(());
    }
    let frame: Value = serde_json::from_str(payload).map_err(|e| {
        RoadieError::agent(
            AgentFault::IntentDetermination,
            format!("unparseable stream frame: {e}"),
        )
    })?;
    *saw_data = true;
    if let Some(fragment) = frame.get("response").and_then(Value::as_str) {
        text.push_str(fragment);
    }
    Ok(())
}

/// The model tends to break replies across lines; spoken output wants one
/// flat sentence stream.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_break = false;
    for ch in text.chars() {
        if ch == '\n' {
            pending_break = true;
            continue;
        }
        if pending_break {
            out.push(' ');
            pending_break = false;
        }
        out.push(ch);
    }
    out.trim().to_string()
}
