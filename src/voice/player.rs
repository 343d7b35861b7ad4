use anyhow::Context;
use log::debug;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::AudioPlayer;
use crate::error::{AppError, AppResult};

/// Plays files on the default output device through rodio.
#[derive(Debug, Clone, Copy)]
pub struct RodioPlayer {
    volume: f32,
}

impl RodioPlayer {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn play_file(&self, path: &Path) -> anyhow::Result<()> {
        // OutputStream is not Send, so it lives only for this call.
        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to create audio output stream")?;

        let file = File::open(path).context("Failed to open audio file")?;
        let source = Decoder::new(BufReader::new(file))
            .context("Failed to decode audio file")?
            .convert_samples::<f32>()
            .amplify(self.volume);

        let sink = Sink::try_new(&stream_handle).context("Failed to create audio sink")?;
        sink.append(source);
        debug!("Playing audio at {:.0}% volume", self.volume * 100.0);
        sink.sleep_until_end();

        drop(stream);
        Ok(())
    }
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&self, path: &Path) -> AppResult<()> {
        self.play_file(path)
            .map_err(|e| AppError::playback(format!("{:#}", e)))
    }
}
