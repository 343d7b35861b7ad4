// file: src/models/event.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};
use crate::utils::time::{millis_to_seconds, seconds_to_millis};

/// An event as the native store holds it. Times are epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NativeEvent {
    pub id: String,
    pub title: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Fields handed to the native store when creating an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNativeEvent {
    pub title: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// The bridge projection of an event. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "start", alias = "startMillis")]
    pub start_millis: f64,
    #[serde(rename = "end", alias = "endMillis")]
    pub end_millis: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

impl From<NativeEvent> for EventRecord {
    fn from(event: NativeEvent) -> Self {
        Self {
            id: event.id,
            title: event.title,
            start_millis: seconds_to_millis(event.start_secs),
            end_millis: seconds_to_millis(event.end_secs),
            location: event.location.unwrap_or_default(),
            notes: event.notes.unwrap_or_default(),
        }
    }
}

/// Validated `createEvent` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub start_millis: f64,
    pub end_millis: f64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl EventDraft {
    pub fn from_map(fields: &Map<String, Value>) -> AppResult<Self> {
        let title = match fields.get("title") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => return Err(AppError::invalid_args("title must not be empty")),
            Some(_) => return Err(AppError::invalid_args("title must be a string")),
            None => return Err(AppError::invalid_args("missing required field: title")),
        };

        let start_millis = required_millis(fields, "start", "startMillis")?;
        let end_millis = required_millis(fields, "end", "endMillis")?;
        if end_millis < start_millis {
            return Err(AppError::invalid_args("end must not be before start"));
        }

        Ok(Self {
            title,
            start_millis,
            end_millis,
            location: optional_text(fields, "location")?,
            notes: optional_text(fields, "notes")?,
        })
    }

    pub fn into_native(self) -> NewNativeEvent {
        NewNativeEvent {
            title: self.title,
            start_secs: millis_to_seconds(self.start_millis),
            end_secs: millis_to_seconds(self.end_millis),
            location: self.location,
            notes: self.notes,
        }
    }
}

fn required_millis(fields: &Map<String, Value>, key: &str, alias: &str) -> AppResult<f64> {
    match fields.get(key).or_else(|| fields.get(alias)) {
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| AppError::invalid_args(format!("{} must be a number of milliseconds", key))),
        None => Err(AppError::invalid_args(format!("missing required field: {}", key))),
    }
}

fn optional_text(fields: &Map<String, Value>, key: &str) -> AppResult<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AppError::invalid_args(format!("{} must be a string", key))),
    }
}
