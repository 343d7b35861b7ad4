// file: src/models/speech.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

pub const RATE_RANGE: (f32, f32) = (0.1, 10.0);
pub const PITCH_RANGE: (f32, f32) = (0.0, 2.0);
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// A voice as the engine reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineVoice {
    pub name: String,
    pub lang: String,
    pub local_service: bool,
    pub default: bool,
}

/// The bridge projection of a voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub name: String,
    pub lang: String,
    #[serde(rename = "localService")]
    pub is_local: bool,
    #[serde(rename = "default")]
    pub is_default: bool,
}

impl From<&EngineVoice> for VoiceDescriptor {
    fn from(voice: &EngineVoice) -> Self {
        Self {
            name: voice.name.clone(),
            lang: voice.lang.clone(),
            is_local: voice.local_service,
            is_default: voice.default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechState {
    Idle,
    Speaking,
    Paused,
}

/// Rate, pitch and volume applied to an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prosody {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl Prosody {
    pub fn clamped(self) -> Self {
        Self {
            rate: self.rate.clamp(RATE_RANGE.0, RATE_RANGE.1),
            pitch: self.pitch.clamp(PITCH_RANGE.0, PITCH_RANGE.1),
            volume: self.volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1),
        }
    }
}

/// `speak` arguments as received from the bridge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_name: Option<String>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
}

impl SpeechRequest {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_voice<S: Into<String>>(mut self, name: S) -> Self {
        self.voice_name = Some(name.into());
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn from_map(args: &Map<String, Value>) -> AppResult<Self> {
        let text = match args.get("text") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(AppError::invalid_args("text must be a string")),
            None => return Err(AppError::invalid_args("missing required field: text")),
        };

        let voice_name = match args.get("voiceName") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(AppError::invalid_args("voiceName must be a string")),
        };

        Ok(Self {
            text,
            voice_name,
            rate: optional_number(args, "rate")?,
            pitch: optional_number(args, "pitch")?,
            volume: optional_number(args, "volume")?,
        })
    }

    /// Fill gaps from `defaults` and clamp to the engine ranges. A zero rate counts as unset.
    pub fn prosody(&self, defaults: Prosody) -> Prosody {
        Prosody {
            rate: self.rate.filter(|r| *r != 0.0).unwrap_or(defaults.rate),
            pitch: self.pitch.unwrap_or(defaults.pitch),
            volume: self.volume.unwrap_or(defaults.volume),
        }
        .clamped()
    }
}

fn optional_number(args: &Map<String, Value>, key: &str) -> AppResult<Option<f32>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| Some(v as f32))
            .ok_or_else(|| AppError::invalid_args(format!("{} must be a number", key))),
    }
}

/// A request resolved against the engine: concrete voice and clamped prosody.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` means the engine's default voice.
    pub voice: Option<EngineVoice>,
    pub prosody: Prosody,
}

impl Utterance {
    /// Exact name match only; an unknown name falls back to the engine default.
    pub fn resolve(request: &SpeechRequest, voices: &[EngineVoice], defaults: Prosody) -> Self {
        let voice = request
            .voice_name
            .as_deref()
            .and_then(|name| voices.iter().find(|v| v.name == name))
            .cloned();

        Self {
            text: request.text.clone(),
            voice,
            prosody: request.prosody(defaults),
        }
    }
}
