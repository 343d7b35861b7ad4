//! Speech synthesis module
//!
//! Drives a host text-to-speech engine for the shell. The engine is injected
//! behind [`SpeechEngine`]; [`SpeechAdapter`] owns the Idle/Speaking/Paused
//! state machine and guarantees at most one utterance in flight.

use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{EngineVoice, Utterance};

pub mod adapter;
pub mod channel;

pub use adapter::{SpeechAdapter, SpeechTicket, UtteranceSink, UtteranceStatus};
pub use channel::SpeechChannel;

/// A host speech engine.
///
/// Lifecycle callbacks go through the [`UtteranceSink`] handed to `speak`, from
/// any thread and possibly before `speak` returns.
pub trait SpeechEngine: Send + Sync {
    fn is_supported(&self) -> bool;

    /// The engine's live voice list. May be empty until the engine finishes loading.
    fn voices(&self) -> Vec<EngineVoice>;

    /// Called once by the adapter; the engine signals through it whenever its voice list changes.
    fn set_voices_listener(&self, listener: VoicesListener);

    fn speak(&self, utterance: Utterance, sink: UtteranceSink);

    fn pause(&self);

    fn resume(&self);

    fn cancel(&self);
}

/// Handle through which an engine reports that its voice list is available.
#[derive(Clone, Debug)]
pub struct VoicesListener {
    ready: Arc<watch::Sender<bool>>,
}

impl VoicesListener {
    pub(crate) fn new(ready: watch::Sender<bool>) -> Self {
        Self {
            ready: Arc::new(ready),
        }
    }

    pub fn voices_changed(&self) {
        debug!("Speech engine reported voices changed");
        self.ready.send_replace(true);
    }
}

/// Engine for hosts without speech synthesis.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpeechEngine;

impl SpeechEngine for NoSpeechEngine {
    fn is_supported(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<EngineVoice> {
        Vec::new()
    }

    fn set_voices_listener(&self, _listener: VoicesListener) {}

    fn speak(&self, _utterance: Utterance, sink: UtteranceSink) {
        sink.failed("speech synthesis is not available on this host");
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn cancel(&self) {}
}
