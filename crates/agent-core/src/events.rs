//! Session log decoding.
//!
//! A session log is newline-delimited JSON, appended to by the agent while
//! it runs. [`EventStream`] decodes it one line at a time and skips any line
//! that is not a complete JSON value, so a log truncated mid-write still
//! yields everything before the partial line. [`LogEvent`] is the typed view
//! the summarizer works from.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

/// `customType` of the event that pins the session's active model.
pub const MODEL_SNAPSHOT: &str = "model-snapshot";

/// Stop reasons meaning the assistant is waiting on a tool call.
const TOOL_STOP_REASONS: &[&str] = &["toolUse", "tool_use", "tool_calls"];

/// Iterator over the JSON records of one log, in line order.
pub struct EventStream<R> {
    lines: Lines<R>,
    error: Option<io::Error>,
}

impl<R: BufRead> EventStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            error: None,
        }
    }

    /// The read error that ended the stream early, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.error.is_some() {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                // Non-UTF-8 line: consumed, treat like any other undecodable line.
                Err(e) if e.kind() == io::ErrorKind::InvalidData => continue,
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(value) => return Some(value),
                Err(e) => {
                    tracing::debug!("Skipping undecodable log line: {}", e);
                    continue;
                }
            }
        }
    }
}

/// Decode records from any buffered reader.
pub fn parse_events<R: BufRead>(reader: R) -> EventStream<R> {
    EventStream::new(reader)
}

/// Open a log file for streaming decode.
pub fn open_events(path: &Path) -> io::Result<EventStream<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(EventStream::new(BufReader::new(file)))
}

/// One record from a session log, classified by its `type` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Session(SessionEvent),
    Message(MessageEvent),
    Custom(CustomEvent),
    /// Any other record. Recognized tags keep their typed view even when
    /// individual fields have unexpected shapes.
    Other(Value),
}

impl LogEvent {
    pub fn from_value(value: Value) -> Self {
        let typed = match value.get("type").and_then(Value::as_str) {
            Some("session") => Some(SessionEvent::deserialize(&value).map(LogEvent::Session)),
            Some("message") => Some(MessageEvent::deserialize(&value).map(LogEvent::Message)),
            Some("custom") => Some(CustomEvent::deserialize(&value).map(LogEvent::Custom)),
            _ => None,
        };
        match typed {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                tracing::debug!("Log record has unexpected shape: {}", e);
                LogEvent::Other(value)
            }
            None => LogEvent::Other(value),
        }
    }
}

impl From<Value> for LogEvent {
    fn from(value: Value) -> Self {
        LogEvent::from_value(value)
    }
}

/// Header record written when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    /// `None` when absent, null or not an object.
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<MessagePayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<String>,
    /// Either a plain string or an array of content blocks.
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub usage: Option<Usage>,
    #[serde(default, deserialize_with = "lenient")]
    pub stop_reason: Option<String>,
}

impl MessagePayload {
    /// Whether the turn ended to run a tool.
    pub fn stopped_for_tool(&self) -> bool {
        self.stop_reason
            .as_deref()
            .is_some_and(|r| TOOL_STOP_REASONS.contains(&r))
    }

    /// Concatenated text of the message content, one block per line.
    pub fn text(&self) -> String {
        match &self.content {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(blocks)) => blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(s) => Some(s.as_str()),
                    other => other.get("text").and_then(Value::as_str),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default, deserialize_with = "token_count")]
    pub total_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub cost: Option<Cost>,
}

impl Usage {
    pub fn tokens(&self) -> u64 {
        self.total_tokens.unwrap_or(0)
    }

    pub fn cost_total(&self) -> f64 {
        self.cost
            .as_ref()
            .and_then(|c| c.total)
            .filter(|t| t.is_finite() && *t >= 0.0)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Cost {
    /// Only JSON numbers count; anything else reads as absent.
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<f64>,
}

/// Application-defined record; `customType` says what `data` holds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub custom_type: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Decode a field as `T`, reading any other shape as absent so one bad
/// field never discards the rest of its record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Token counts: non-negative integers, or floats with no fractional part.
fn token_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|t| t.is_finite() && *t >= 0.0 && t.fract() == 0.0 && *t <= u64::MAX as f64)
            .map(|t| t as u64)
    }))
}

impl CustomEvent {
    /// Non-empty `data.label`, if any.
    pub fn label(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get("label")?
            .as_str()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// `data.modelId` of a model snapshot.
    pub fn snapshot_model(&self) -> Option<&str> {
        if self.custom_type.as_deref() != Some(MODEL_SNAPSHOT) {
            return None;
        }
        self.data
            .as_ref()?
            .get("modelId")?
            .as_str()
            .filter(|m| !m.is_empty())
    }
}
