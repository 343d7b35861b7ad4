//! Bridge protocol module
//!
//! The shell talks to native adapters through named channels. Each call carries
//! a method name and a JSON argument value; each reply is a success value, a
//! structured `(code, message)` error, or a "not implemented" signal.

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{AppError, AppResult, ErrorCode};
use crate::utils::logging::log_bridge_call;

pub mod events;
pub mod transport;

pub use events::{BridgeEvent, EventSink};

pub const CALENDAR_CHANNEL: &str = "ai.assistant/calendar";
pub const SPEECH_CHANNEL: &str = "ai.assistant/speech";
pub const VOICE_CHANNEL: &str = "ai.assistant/voice";

/// A single request addressed to a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Value,
}

impl MethodCall {
    pub fn new<S: Into<String>>(method: S, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// A call with no arguments.
    pub fn bare<S: Into<String>>(method: S) -> Self {
        Self::new(method, Value::Null)
    }

    pub fn arguments_map(&self) -> AppResult<&Map<String, Value>> {
        self.arguments
            .as_object()
            .ok_or_else(|| AppError::invalid_args("Invalid arguments"))
    }

    pub fn number(&self, key: &str) -> AppResult<f64> {
        self.arguments_map()?
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| AppError::invalid_args(format!("Invalid arguments: {} must be a number", key)))
    }

    pub fn string(&self, key: &str) -> AppResult<String> {
        self.arguments_map()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::invalid_args(format!("Invalid arguments: {} must be a string", key)))
    }
}

/// The structured error that crosses the bridge in place of a native exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl BridgeError {
    pub fn new<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
}

impl From<AppError> for BridgeError {
    fn from(error: AppError) -> Self {
        Self::new(error.code(), error.message())
    }
}

pub type PendingReply = Pin<Box<dyn Future<Output = MethodResult> + Send + 'static>>;

/// Outcome of a handled call.
pub enum MethodResult {
    Success(Value),
    Error(BridgeError),
    NotImplemented,
    /// The ordered part of the call is done; the reply arrives when the future resolves.
    Pending(PendingReply),
}

impl MethodResult {
    pub fn success<T: Serialize>(value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Error(BridgeError::new(
                ErrorCode::InternalError,
                format!("Failed to encode reply: {}", e),
            )),
        }
    }

    pub fn empty() -> Self {
        Self::Success(Value::Null)
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = MethodResult> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    pub fn from_result<T: Serialize>(result: AppResult<T>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(e) => e.into(),
        }
    }

    /// Awaits any pending chain down to a final result.
    pub async fn resolve(self) -> MethodResult {
        let mut current = self;
        loop {
            match current {
                MethodResult::Pending(future) => current = future.await,
                other => return other,
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Error(e) => Some(e.code),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

impl From<AppError> for MethodResult {
    fn from(error: AppError) -> Self {
        Self::Error(error.into())
    }
}

impl std::fmt::Debug for MethodResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(value) => f.debug_tuple("Success").field(value).finish(),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Self::NotImplemented => f.write_str("NotImplemented"),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// One channel's request handler.
///
/// `handle` runs in request order; anything that must wait on the host should
/// return `MethodResult::Pending` instead of blocking later calls.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, call: MethodCall) -> MethodResult;
}

/// Channel registry.
#[derive(Default, Clone)]
pub struct Bridge {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S, H>(&mut self, channel: S, handler: H) -> &mut Self
    where
        S: Into<String>,
        H: MethodHandler + 'static,
    {
        let channel = channel.into();
        if self.handlers.insert(channel.clone(), Arc::new(handler)).is_some() {
            warn!("Replaced existing handler for channel '{}'", channel);
        }
        self
    }

    pub fn channels(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn dispatch(&self, channel: &str, call: MethodCall) -> MethodResult {
        let Some(handler) = self.handlers.get(channel) else {
            warn!("No handler registered for channel '{}'", channel);
            return MethodResult::NotImplemented;
        };

        let method = call.method.clone();
        let started = Instant::now();
        let result = handler.handle(call).await;
        log_bridge_call(channel, &method, started.elapsed());

        match &result {
            MethodResult::Error(e) => warn!("[Bridge] {}::{} returned {}", channel, method, e.code),
            MethodResult::NotImplemented => warn!("[Bridge] {}::{} is not implemented", channel, method),
            _ => {}
        }

        result
    }
}
