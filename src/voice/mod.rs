// Voice capture and playback module
// Records microphone audio to WAV files and plays audio files for the shell.

use std::path::Path;

use crate::error::AppResult;

pub mod adapter;
pub mod channel;
pub mod player;
pub mod recorder;

pub use adapter::VoiceAdapter;
pub use channel::VoiceChannel;
pub use player::RodioPlayer;
pub use recorder::CpalRecorder;

/// Microphone capture into a WAV file.
#[cfg_attr(test, mockall::automock)]
pub trait AudioRecorder: Send + Sync {
    fn start(&self, path: &Path) -> AppResult<()>;

    /// Finalizes the file being written.
    fn stop(&self) -> AppResult<()>;

    fn is_recording(&self) -> bool;
}

/// Audio file playback. `play` blocks until the file has finished playing.
#[cfg_attr(test, mockall::automock)]
pub trait AudioPlayer: Send + Sync {
    fn play(&self, path: &Path) -> AppResult<()>;
}
