use anyhow::{anyhow, Context};
use log::{debug, error, info, warn};
use rodio::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rodio::cpal::{self, SampleFormat, SizedSample, StreamConfig};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard};
use std::thread::JoinHandle;

use super::AudioRecorder;
use crate::error::{AppError, AppResult};

const WAV_HEADER_LEN: u32 = 44;

enum CaptureMessage {
    Samples(Vec<i16>),
    Stop,
}

struct Capture {
    control: mpsc::Sender<CaptureMessage>,
    worker: JoinHandle<anyhow::Result<()>>,
}

/// Records from the default input device into 16-bit PCM WAV files.
///
/// cpal streams are not `Send` everywhere, so each capture owns a dedicated
/// thread that builds the stream and appends samples to the file as they arrive.
#[derive(Default)]
pub struct CpalRecorder {
    active: Mutex<Option<Capture>>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, Option<Capture>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AudioRecorder for CpalRecorder {
    fn start(&self, path: &Path) -> AppResult<()> {
        let mut active = self.active();
        if active.is_some() {
            return Err(AppError::record("a recording is already in progress"));
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (control, messages) = mpsc::channel::<CaptureMessage>();
        let samples = control.clone();
        let path = path.to_path_buf();

        let worker = std::thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || capture_until_stopped(path, ready_tx, samples, messages))
            .map_err(|e| AppError::record(format!("cannot start capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *active = Some(Capture { control, worker });
                Ok(())
            }
            Ok(Err(message)) => {
                let _ = worker.join();
                Err(AppError::record(message))
            }
            Err(_) => {
                let _ = worker.join();
                Err(AppError::record("capture thread exited before starting"))
            }
        }
    }

    fn stop(&self) -> AppResult<()> {
        let Some(capture) = self.active().take() else {
            return Ok(());
        };

        let _ = capture.control.send(CaptureMessage::Stop);
        match capture.worker.join() {
            Ok(result) => result.map_err(|e| AppError::record(format!("{:#}", e))),
            Err(_) => Err(AppError::record("capture thread panicked")),
        }
    }

    fn is_recording(&self) -> bool {
        self.active().is_some()
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Recording did not finalize cleanly: {}", e);
        }
    }
}

fn capture_until_stopped(
    path: PathBuf,
    ready: mpsc::Sender<Result<(), String>>,
    samples: mpsc::Sender<CaptureMessage>,
    messages: mpsc::Receiver<CaptureMessage>,
) -> anyhow::Result<()> {
    let opened = open_input(samples).and_then(|(stream, config)| {
        let writer = WavWriter::create(&path, config.channels, config.sample_rate.0)
            .with_context(|| format!("Failed to create recording {:?}", path.file_name()))?;
        Ok((stream, writer))
    });
    let (stream, mut writer) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            warn!("Audio capture unavailable: {:#}", e);
            let _ = ready.send(Err(format!("{:#}", e)));
            return Ok(());
        }
    };
    let _ = ready.send(Ok(()));

    // The stream holds a sender, so the loop ends on Stop rather than on disconnect.
    for message in messages.iter() {
        match message {
            CaptureMessage::Samples(chunk) => writer.write_samples(&chunk)?,
            CaptureMessage::Stop => break,
        }
    }
    drop(stream);
    for message in messages.try_iter() {
        if let CaptureMessage::Samples(chunk) = message {
            writer.write_samples(&chunk)?;
        }
    }

    let written = writer.finalize().context("Failed to finalize recording")?;
    info!("Recording saved ({} bytes of audio)", written);
    Ok(())
}

fn open_input(samples: mpsc::Sender<CaptureMessage>) -> anyhow::Result<(cpal::Stream, StreamConfig)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no audio input device available"))?;
    let supported = device
        .default_input_config()
        .context("Failed to query input configuration")?;
    let config = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, samples, f32_to_i16)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, samples, |s| s)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, samples, u16_to_i16)?,
        other => return Err(anyhow!("unsupported input sample format {:?}", other)),
    };
    stream.play().context("Failed to start input stream")?;
    debug!("Capturing {} channel(s) at {} Hz", config.channels, config.sample_rate.0);
    Ok((stream, config))
}

fn build_stream<T: SizedSample + 'static>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: mpsc::Sender<CaptureMessage>,
    convert: fn(T) -> i16,
) -> anyhow::Result<cpal::Stream> {
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let chunk = data.iter().copied().map(convert).collect();
                let _ = samples.send(CaptureMessage::Samples(chunk));
            },
            |e| error!("Audio input stream error: {}", e),
            None,
        )
        .context("Failed to build input stream")
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn u16_to_i16(sample: u16) -> i16 {
    (sample as i32 - 32_768) as i16
}

/// Streaming 16-bit PCM WAV writer. Sizes in the header are patched on `finalize`.
pub struct WavWriter {
    out: BufWriter<File>,
    data_len: u32,
}

impl WavWriter {
    /// Creates `path`, refusing to overwrite an existing file.
    pub fn create(path: &Path, channels: u16, sample_rate: u32) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut out = BufWriter::new(file);

        let block_align = channels * 2;
        let byte_rate = sample_rate * block_align as u32;
        out.write_all(b"RIFF")?;
        out.write_all(&(WAV_HEADER_LEN - 8).to_le_bytes())?;
        out.write_all(b"WAVE")?;
        out.write_all(b"fmt ")?;
        out.write_all(&16u32.to_le_bytes())?;
        out.write_all(&1u16.to_le_bytes())?;
        out.write_all(&channels.to_le_bytes())?;
        out.write_all(&sample_rate.to_le_bytes())?;
        out.write_all(&byte_rate.to_le_bytes())?;
        out.write_all(&block_align.to_le_bytes())?;
        out.write_all(&16u16.to_le_bytes())?;
        out.write_all(b"data")?;
        out.write_all(&0u32.to_le_bytes())?;

        Ok(Self { out, data_len: 0 })
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        let bytes = u32::try_from(samples.len() * 2)
            .ok()
            .and_then(|len| len.checked_add(self.data_len))
            .filter(|total| total.checked_add(WAV_HEADER_LEN).is_some())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "WAV size limit reached"))?;

        for sample in samples {
            self.out.write_all(&sample.to_le_bytes())?;
        }
        self.data_len = bytes;
        Ok(())
    }

    /// Writes the final RIFF and data sizes. Returns the audio byte count.
    pub fn finalize(mut self) -> io::Result<u32> {
        self.out.seek(SeekFrom::Start(4))?;
        self.out.write_all(&(WAV_HEADER_LEN - 8 + self.data_len).to_le_bytes())?;
        self.out.seek(SeekFrom::Start(40))?;
        self.out.write_all(&self.data_len.to_le_bytes())?;
        self.out.flush()?;
        Ok(self.data_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_conversion() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-4.0), -i16::MAX);
        assert_eq!(u16_to_i16(32_768), 0);
        assert_eq!(u16_to_i16(0), i16::MIN);
    }

    #[test]
    fn test_wav_writer_streams_and_patches_sizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.wav");
        let mut writer = WavWriter::create(&path, 1, 16_000).unwrap();
        writer.write_samples(&[0, 1]).unwrap();
        writer.write_samples(&[-1]).unwrap();
        assert_eq!(writer.finalize().unwrap(), 6);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 44 + 6);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 42);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 16_000);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 32_000);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 6);
        assert_eq!(i16::from_le_bytes([bytes[48], bytes[49]]), -1);
    }

    #[test]
    fn test_wav_writer_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taken.wav");
        std::fs::write(&path, b"keep").unwrap();

        let err = WavWriter::create(&path, 1, 16_000).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
    }

    #[test]
    fn test_stop_without_start() {
        let recorder = CpalRecorder::new();
        assert!(!recorder.is_recording());
        recorder.stop().unwrap();
    }
}
