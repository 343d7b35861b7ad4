use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{AudioPlayer, AudioRecorder};
use crate::error::{AppError, AppResult};
use crate::utils::time::now_millis;

/// First free `recording_<millis>.wav` in `dir`, stepping past files that already exist.
fn recording_path(dir: &Path, mut stamp: i64) -> PathBuf {
    loop {
        let path = dir.join(format!("recording_{}.wav", stamp));
        if !path.exists() {
            return path;
        }
        stamp += 1;
    }
}

#[derive(Clone)]
pub struct VoiceAdapter {
    recorder: Arc<dyn AudioRecorder>,
    player: Arc<dyn AudioPlayer>,
    recordings_dir: PathBuf,
}

impl VoiceAdapter {
    pub fn new(
        recorder: Arc<dyn AudioRecorder>,
        player: Arc<dyn AudioPlayer>,
        recordings_dir: PathBuf,
    ) -> Self {
        Self {
            recorder,
            player,
            recordings_dir,
        }
    }

    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Starts recording into `recording_<epochMillis>.wav` and returns its path.
    ///
    /// Device setup blocks, so it runs on the blocking pool.
    pub async fn start_recording(&self) -> AppResult<PathBuf> {
        let adapter = self.clone();
        tokio::task::spawn_blocking(move || adapter.start_recording_blocking())
            .await
            .map_err(|e| AppError::record(format!("recording task failed: {}", e)))?
    }

    /// Finalizes the current recording. No-op when idle.
    pub async fn stop_recording(&self) -> AppResult<()> {
        let adapter = self.clone();
        tokio::task::spawn_blocking(move || adapter.stop_recording_blocking())
            .await
            .map_err(|e| AppError::record(format!("recording task failed: {}", e)))?
    }

    fn start_recording_blocking(&self) -> AppResult<PathBuf> {
        if self.recorder.is_recording() {
            return Err(AppError::record("a recording is already in progress"));
        }

        std::fs::create_dir_all(&self.recordings_dir)
            .map_err(|e| AppError::record(format!("cannot create recordings directory: {}", e)))?;

        let path = recording_path(&self.recordings_dir, now_millis());
        self.recorder.start(&path)?;
        info!("Recording started");
        Ok(path)
    }

    fn stop_recording_blocking(&self) -> AppResult<()> {
        if !self.recorder.is_recording() {
            debug!("stopRecording with no active recording");
            return Ok(());
        }
        self.recorder.stop()?;
        info!("Recording stopped");
        Ok(())
    }

    /// Plays `path` on a blocking task and returns without waiting for it.
    pub fn play_audio(&self, path: PathBuf) -> AppResult<JoinHandle<()>> {
        if !path.is_file() {
            return Err(AppError::playback("audio file not found"));
        }

        let player = Arc::clone(&self.player);
        Ok(tokio::task::spawn_blocking(move || {
            if let Err(e) = player.play(&path) {
                error!("Failed to play audio: {}", e.to_safe_string());
            }
        }))
    }
}
