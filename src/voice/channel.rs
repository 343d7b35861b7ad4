use async_trait::async_trait;
use std::path::PathBuf;

use super::VoiceAdapter;
use crate::bridge::{MethodCall, MethodHandler, MethodResult, VOICE_CHANNEL};
use crate::error::{AppError, AppResult};
use crate::utils::logging::log_bridge_failure;

/// Bridge handler for `ai.assistant/voice`.
pub struct VoiceChannel {
    adapter: VoiceAdapter,
}

impl VoiceChannel {
    pub fn new(adapter: VoiceAdapter) -> Self {
        Self { adapter }
    }

    fn play_audio(&self, call: &MethodCall) -> AppResult<MethodResult> {
        let file_path = call
            .string("filePath")
            .ok()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::invalid_args("File path is required"))?;
        self.adapter.play_audio(PathBuf::from(file_path))?;
        Ok(MethodResult::empty())
    }
}

#[async_trait]
impl MethodHandler for VoiceChannel {
    async fn handle(&self, call: MethodCall) -> MethodResult {
        let outcome = match call.method.as_str() {
            "startRecording" => self
                .adapter
                .start_recording()
                .await
                .map(|path| MethodResult::success(path.to_string_lossy())),
            "stopRecording" => self.adapter.stop_recording().await.map(|_| MethodResult::empty()),
            "playAudio" => self.play_audio(&call),
            _ => return MethodResult::NotImplemented,
        };

        outcome.unwrap_or_else(|e| {
            log_bridge_failure(VOICE_CHANNEL, &call.method, &e);
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::voice::{MockAudioPlayer, MockAudioRecorder};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_play_audio_requires_file_path() {
        let dir = TempDir::new().unwrap();
        let mut player = MockAudioPlayer::new();
        player.expect_play().times(0);
        let channel = VoiceChannel::new(VoiceAdapter::new(
            Arc::new(MockAudioRecorder::new()),
            Arc::new(player),
            dir.path().to_path_buf(),
        ));

        for args in [json!(null), json!({}), json!({"filePath": ""}), json!({"filePath": 3})] {
            let result = channel.handle(MethodCall::new("playAudio", args)).await;
            assert_eq!(result.error_code(), Some(ErrorCode::InvalidArgs));
        }
    }

    #[tokio::test]
    async fn test_start_recording_returns_path() {
        let dir = TempDir::new().unwrap();
        let mut recorder = MockAudioRecorder::new();
        recorder.expect_is_recording().return_const(false);
        recorder.expect_start().returning(|_| Ok(()));
        let channel = VoiceChannel::new(VoiceAdapter::new(
            Arc::new(recorder),
            Arc::new(MockAudioPlayer::new()),
            dir.path().to_path_buf(),
        ));

        let value = channel.handle(MethodCall::bare("startRecording")).await.into_value().unwrap();
        let path = value.as_str().unwrap();
        assert!(path.starts_with(dir.path().to_str().unwrap()));
        assert!(path.ends_with(".wav"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = TempDir::new().unwrap();
        let channel = VoiceChannel::new(VoiceAdapter::new(
            Arc::new(MockAudioRecorder::new()),
            Arc::new(MockAudioPlayer::new()),
            dir.path().to_path_buf(),
        ));
        let result = channel.handle(MethodCall::bare("transcribe")).await;
        assert!(matches!(result, MethodResult::NotImplemented));
    }
}
