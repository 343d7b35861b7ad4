use log::{debug, info, warn};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use super::{SpeechEngine, VoicesListener};
use crate::bridge::{BridgeEvent, EventSink, SPEECH_CHANNEL};
use crate::error::{AppError, AppResult, ErrorCode};
use crate::models::{Prosody, SpeechRequest, SpeechState, Utterance, VoiceDescriptor};

/// Where an utterance is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceStatus {
    Queued,
    Started,
    Ended,
    Failed(String),
    Canceled,
}

impl UtteranceStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed(_) | Self::Canceled)
    }

    fn outcome(&self) -> AppResult<()> {
        match self {
            Self::Queued | Self::Started | Self::Ended => Ok(()),
            Self::Failed(msg) => Err(AppError::engine(msg.clone())),
            Self::Canceled => Err(AppError::canceled("utterance was canceled")),
        }
    }
}

struct Active {
    id: u64,
    status: watch::Sender<UtteranceStatus>,
}

struct Session {
    state: SpeechState,
    current: Option<Active>,
    next_id: u64,
}

struct Shared {
    session: Mutex<Session>,
    events: EventSink,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: &str, payload: serde_json::Value) {
        self.events.emit(BridgeEvent::new(SPEECH_CHANNEL, event, payload));
    }
}

/// Callback handle for one utterance.
///
/// Reports from an utterance that is no longer current are ignored.
#[derive(Clone)]
pub struct UtteranceSink {
    id: u64,
    shared: Arc<Shared>,
}

impl UtteranceSink {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn started(&self) {
        {
            let mut session = self.shared.lock();
            let Some(active) = session.current.as_ref().filter(|a| a.id == self.id) else {
                debug!("Ignoring start of stale utterance {}", self.id);
                return;
            };
            active.status.send_replace(UtteranceStatus::Started);
            if session.state == SpeechState::Idle {
                session.state = SpeechState::Speaking;
            }
        }
        self.shared.emit("start", json!({ "utteranceId": self.id }));
    }

    pub fn ended(&self) {
        if self.finish(UtteranceStatus::Ended) {
            self.shared.emit("end", json!({ "utteranceId": self.id }));
        }
    }

    pub fn failed<S: Into<String>>(&self, message: S) {
        let message = message.into();
        if self.finish(UtteranceStatus::Failed(message.clone())) {
            warn!("Utterance {} failed: {}", self.id, message);
            self.shared.emit(
                "error",
                json!({
                    "utteranceId": self.id,
                    "code": ErrorCode::EngineError,
                    "message": message,
                }),
            );
        }
    }

    fn finish(&self, status: UtteranceStatus) -> bool {
        let mut session = self.shared.lock();
        if !session.current.as_ref().is_some_and(|a| a.id == self.id) {
            debug!("Ignoring completion of stale utterance {}", self.id);
            return false;
        }
        if let Some(active) = session.current.take() {
            active.status.send_replace(status);
        }
        session.state = SpeechState::Idle;
        true
    }
}

/// Handle returned by [`SpeechAdapter::speak`].
#[derive(Debug, Clone)]
pub struct SpeechTicket {
    id: u64,
    status: watch::Receiver<UtteranceStatus>,
}

impl SpeechTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Resolves once the engine starts speaking. Fails if the utterance is
    /// canceled or errors out first.
    pub async fn started(&self) -> AppResult<()> {
        self.wait(|s| *s != UtteranceStatus::Queued).await
    }

    /// Resolves once the utterance has ended, failed or been canceled.
    pub async fn finished(&self) -> AppResult<()> {
        self.wait(UtteranceStatus::is_terminal).await
    }

    async fn wait(&self, done: impl FnMut(&UtteranceStatus) -> bool) -> AppResult<()> {
        let mut status = self.status.clone();
        let outcome = match status.wait_for(done).await {
            Ok(current) => current.outcome(),
            Err(_) => Err(AppError::engine("speech engine dropped the utterance")),
        };
        outcome
    }
}

/// Speech state machine over a host engine.
///
/// At most one utterance is in flight; `speak` cancels whatever is current.
#[derive(Clone)]
pub struct SpeechAdapter {
    engine: Arc<dyn SpeechEngine>,
    shared: Arc<Shared>,
    voices_ready: watch::Receiver<bool>,
    defaults: Prosody,
}

impl SpeechAdapter {
    pub fn new(engine: Arc<dyn SpeechEngine>, events: EventSink) -> Self {
        let (ready_tx, voices_ready) = watch::channel(false);
        engine.set_voices_listener(VoicesListener::new(ready_tx));

        Self {
            engine,
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    state: SpeechState::Idle,
                    current: None,
                    next_id: 1,
                }),
                events,
            }),
            voices_ready,
            defaults: Prosody::default(),
        }
    }

    /// Prosody used where a request leaves a field unset.
    pub fn with_defaults(mut self, defaults: Prosody) -> Self {
        self.defaults = defaults.clamped();
        self
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_supported()
    }

    pub fn state(&self) -> SpeechState {
        self.shared.lock().state
    }

    /// True while an utterance is speaking or paused.
    pub fn is_speaking(&self) -> bool {
        self.state() != SpeechState::Idle
    }

    /// The engine's voices. Waits for the engine's first voices-changed signal
    /// when the list is not loaded yet.
    pub async fn voices(&self) -> Vec<VoiceDescriptor> {
        if !self.engine.is_supported() {
            return Vec::new();
        }

        let live = self.engine.voices();
        if !live.is_empty() {
            return live.iter().map(VoiceDescriptor::from).collect();
        }

        debug!("Voice list empty, waiting for the engine to load voices");
        let mut ready = self.voices_ready.clone();
        if ready.wait_for(|loaded| *loaded).await.is_err() {
            warn!("Speech engine dropped its voices listener before loading voices");
        }
        self.engine.voices().iter().map(VoiceDescriptor::from).collect()
    }

    /// Cancels any current utterance, then hands `request` to the engine.
    pub fn speak(&self, request: SpeechRequest) -> AppResult<SpeechTicket> {
        if !self.engine.is_supported() {
            return Err(AppError::unsupported("speech synthesis is not available"));
        }

        self.cancel();

        let utterance = Utterance::resolve(&request, &self.engine.voices(), self.defaults);
        if request.voice_name.is_some() && utterance.voice.is_none() {
            debug!("Requested voice not found, using engine default");
        }

        let (status_tx, status_rx) = watch::channel(UtteranceStatus::Queued);
        let id = {
            let mut session = self.shared.lock();
            let id = session.next_id;
            session.next_id += 1;
            session.current = Some(Active { id, status: status_tx });
            id
        };

        info!("Speaking utterance {} ({} chars)", id, utterance.text.chars().count());
        let sink = UtteranceSink {
            id,
            shared: Arc::clone(&self.shared),
        };
        self.engine.speak(utterance, sink);

        Ok(SpeechTicket { id, status: status_rx })
    }

    /// Pauses a speaking utterance. No-op otherwise.
    pub fn pause(&self) {
        {
            let mut session = self.shared.lock();
            if session.state != SpeechState::Speaking {
                debug!("Pause ignored in state {:?}", session.state);
                return;
            }
            session.state = SpeechState::Paused;
        }
        self.engine.pause();
    }

    /// Resumes a paused utterance. No-op otherwise.
    pub fn resume(&self) {
        {
            let mut session = self.shared.lock();
            if session.state != SpeechState::Paused {
                debug!("Resume ignored in state {:?}", session.state);
                return;
            }
            session.state = SpeechState::Speaking;
        }
        self.engine.resume();
    }

    /// Stops and discards the current utterance. Idempotent.
    pub fn cancel(&self) {
        let active = {
            let mut session = self.shared.lock();
            session.state = SpeechState::Idle;
            session.current.take()
        };

        let Some(active) = active else {
            return;
        };

        self.engine.cancel();
        active.status.send_replace(UtteranceStatus::Canceled);
        debug!("Canceled utterance {}", active.id);
        self.shared.emit(
            "error",
            json!({
                "utteranceId": active.id,
                "code": ErrorCode::Canceled,
                "message": "utterance was canceled",
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineVoice;
    use crate::speech::NoSpeechEngine;

    #[derive(Default)]
    struct Recorder {
        sinks: Mutex<Vec<UtteranceSink>>,
        cancels: Mutex<u32>,
    }

    impl SpeechEngine for Recorder {
        fn is_supported(&self) -> bool {
            true
        }
        fn voices(&self) -> Vec<EngineVoice> {
            vec![EngineVoice {
                name: "Alex".to_string(),
                lang: "en-US".to_string(),
                local_service: true,
                default: true,
            }]
        }
        fn set_voices_listener(&self, _listener: VoicesListener) {}
        fn speak(&self, _utterance: Utterance, sink: UtteranceSink) {
            self.sinks.lock().unwrap().push(sink);
        }
        fn pause(&self) {}
        fn resume(&self) {}
        fn cancel(&self) {
            *self.cancels.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_status_outcomes() {
        assert!(UtteranceStatus::Ended.outcome().is_ok());
        assert_eq!(
            UtteranceStatus::Canceled.outcome().unwrap_err().code(),
            ErrorCode::Canceled
        );
        assert_eq!(
            UtteranceStatus::Failed("x".into()).outcome().unwrap_err().code(),
            ErrorCode::EngineError
        );
        assert!(!UtteranceStatus::Started.is_terminal());
    }

    #[test]
    fn test_unsupported_engine_rejects_speak() {
        let adapter = SpeechAdapter::new(Arc::new(NoSpeechEngine), EventSink::disconnected());
        let err = adapter.speak(SpeechRequest::new("hi")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unsupported);
        assert!(!adapter.is_speaking());
    }

    #[tokio::test]
    async fn test_state_follows_engine_callbacks() {
        let engine = Arc::new(Recorder::default());
        let adapter = SpeechAdapter::new(engine.clone(), EventSink::disconnected());

        let ticket = adapter.speak(SpeechRequest::new("hello")).unwrap();
        assert_eq!(adapter.state(), SpeechState::Idle);

        let sink = engine.sinks.lock().unwrap()[0].clone();
        sink.started();
        ticket.started().await.unwrap();
        assert_eq!(adapter.state(), SpeechState::Speaking);

        adapter.pause();
        assert_eq!(adapter.state(), SpeechState::Paused);
        assert!(adapter.is_speaking());
        adapter.pause();
        assert_eq!(adapter.state(), SpeechState::Paused);

        adapter.resume();
        assert_eq!(adapter.state(), SpeechState::Speaking);

        sink.ended();
        ticket.finished().await.unwrap();
        assert_eq!(adapter.state(), SpeechState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let engine = Arc::new(Recorder::default());
        let adapter = SpeechAdapter::new(engine.clone(), EventSink::disconnected());

        adapter.cancel();
        assert_eq!(*engine.cancels.lock().unwrap(), 0);

        let ticket = adapter.speak(SpeechRequest::new("hello")).unwrap();
        adapter.cancel();
        adapter.cancel();
        assert_eq!(*engine.cancels.lock().unwrap(), 1);
        assert_eq!(ticket.started().await.unwrap_err().code(), ErrorCode::Canceled);

        // Late callbacks from the canceled utterance change nothing.
        engine.sinks.lock().unwrap()[0].started();
        assert_eq!(adapter.state(), SpeechState::Idle);
    }

    #[test]
    fn test_defaults_are_clamped() {
        let adapter = SpeechAdapter::new(Arc::new(NoSpeechEngine), EventSink::disconnected())
            .with_defaults(Prosody {
                rate: 20.0,
                pitch: 1.0,
                volume: 2.0,
            });
        assert_eq!(adapter.defaults.rate, 10.0);
        assert_eq!(adapter.defaults.volume, 1.0);
    }
}
