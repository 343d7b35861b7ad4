// Declare modules
pub mod event;
pub mod speech;

// Re-export all public types so callers can use `crate::models::EventRecord` etc.
pub use event::{EventDraft, EventRecord, NativeEvent, NewNativeEvent};
pub use speech::{EngineVoice, Prosody, SpeechRequest, SpeechState, Utterance, VoiceDescriptor};
