// hostbridge library
// Native calendar, speech and voice adapters exposed to a shell over named channels

pub mod bridge;
pub mod calendar;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod speech;
pub mod utils;
pub mod voice;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeEvent, EventSink, MethodCall, MethodHandler, MethodResult};
pub use calendar::{CalendarAdapter, CalendarChannel, CalendarStore, SqliteCalendarStore, StoreError};
pub use config::BridgeConfig;
pub use database::Database;
pub use error::{AppError, AppResult, ErrorCode};
pub use models::*;
pub use speech::{NoSpeechEngine, SpeechAdapter, SpeechChannel, SpeechEngine};
pub use voice::{CpalRecorder, RodioPlayer, VoiceAdapter, VoiceChannel};

/// Builds the bridge with all three channels registered.
pub fn build_bridge(calendar: CalendarAdapter, speech: SpeechAdapter, voice: VoiceAdapter) -> Bridge {
    let mut bridge = Bridge::new();
    bridge
        .register(bridge::CALENDAR_CHANNEL, CalendarChannel::new(calendar))
        .register(bridge::SPEECH_CHANNEL, SpeechChannel::new(speech))
        .register(bridge::VOICE_CHANNEL, VoiceChannel::new(voice));
    bridge
}
