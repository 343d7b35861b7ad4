use async_trait::async_trait;

use super::SpeechAdapter;
use crate::bridge::{MethodCall, MethodHandler, MethodResult, SPEECH_CHANNEL};
use crate::error::AppResult;
use crate::models::SpeechRequest;
use crate::utils::logging::log_bridge_failure;

/// Bridge handler for `ai.assistant/speech`.
pub struct SpeechChannel {
    adapter: SpeechAdapter,
}

impl SpeechChannel {
    pub fn new(adapter: SpeechAdapter) -> Self {
        Self { adapter }
    }

    fn speak(&self, call: &MethodCall) -> AppResult<MethodResult> {
        let request = SpeechRequest::from_map(call.arguments_map()?)?;
        let ticket = self.adapter.speak(request)?;

        Ok(MethodResult::pending(async move {
            match ticket.started().await {
                Ok(()) => MethodResult::success("started"),
                Err(e) => {
                    log_bridge_failure(SPEECH_CHANNEL, "speak", &e);
                    e.into()
                }
            }
        }))
    }

    fn get_voices(&self) -> MethodResult {
        let adapter = self.adapter.clone();
        MethodResult::pending(async move { MethodResult::success(adapter.voices().await) })
    }
}

#[async_trait]
impl MethodHandler for SpeechChannel {
    async fn handle(&self, call: MethodCall) -> MethodResult {
        let outcome = match call.method.as_str() {
            "isSupported" => Ok(MethodResult::success(self.adapter.is_supported())),
            "getVoices" => Ok(self.get_voices()),
            "speak" => self.speak(&call),
            "pause" => {
                self.adapter.pause();
                Ok(MethodResult::empty())
            }
            "resume" => {
                self.adapter.resume();
                Ok(MethodResult::empty())
            }
            "cancel" => {
                self.adapter.cancel();
                Ok(MethodResult::empty())
            }
            "isSpeaking" => Ok(MethodResult::success(self.adapter.is_speaking())),
            _ => return MethodResult::NotImplemented,
        };

        outcome.unwrap_or_else(|e| {
            log_bridge_failure(SPEECH_CHANNEL, &call.method, &e);
            e.into()
        })
    }
}
