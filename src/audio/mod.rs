//! Media backend interface and the WAV reference backend
//!
//! This module provides:
//! - The traits the controller drives: `PlayerBackend`, `RecorderBackend`
//!   and the `MediaBackend` factory that creates them
//! - `WavBackend`, a file based implementation using hound
//! - `Recordings`, helpers for the recordings directory

mod playback;
mod recorder;

use crate::controller::{PlayerEvents, RecorderEvents};
use crate::error::{BackendError, BackendResult};
use std::path::{Path, PathBuf};

pub use playback::WavPlayer;
pub use recorder::{Recordings, WavRecorder};

/// Recorder sample rate
pub const RECORDER_SAMPLE_RATE: u32 = 16000;
/// Recorder channel count
pub const RECORDER_CHANNELS: u16 = 1;

/// Audio stream the player is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamKind {
    #[default]
    Music,
    Voice,
    Notification,
}

/// Player configuration, applied when the player is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// File path or URL, when one has been set
    pub source: Option<String>,
    pub looping: bool,
    pub stream: StreamKind,
}

/// Recorder configuration, applied when the recorder is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Output file path
    pub output: String,
    /// Maximum duration in milliseconds, <= 0 for no limit
    pub max_duration_ms: i32,
    /// Maximum file size in bytes, <= 0 for no limit
    pub max_file_size: i64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A player device
///
/// `prepare_async` returns as soon as the request is issued; the outcome
/// arrives later as `PlayerEvent::Prepared` or `PlayerEvent::Error`.
pub trait PlayerBackend: Send {
    fn prepare_async(&mut self) -> BackendResult<()>;
    fn start(&mut self) -> BackendResult<()>;
    fn pause(&mut self) -> BackendResult<()>;
    /// Completion is reported with `PlayerEvent::SeekComplete`
    fn seek_to(&mut self, offset_ms: u32) -> BackendResult<()>;
    fn set_looping(&mut self, looping: bool);
    /// Current position in milliseconds
    fn current_position(&self) -> i64;
    /// Duration in milliseconds, -1 when unknown
    fn duration(&self) -> i64;
    fn release(&mut self);
}

/// A recorder device
///
/// Unlike the player, `prepare` blocks until the device is ready.
pub trait RecorderBackend: Send {
    fn prepare(&mut self) -> BackendResult<()>;
    fn start(&mut self) -> BackendResult<()>;
    fn stop(&mut self) -> BackendResult<()>;
    fn set_max_duration(&mut self, max_duration_ms: i32);
    fn set_max_file_size(&mut self, max_file_size: i64);
    fn release(&mut self);
}

/// Creates player and recorder devices on demand
pub trait MediaBackend: Send {
    fn create_player(
        &mut self,
        config: PlayerConfig,
        events: PlayerEvents,
    ) -> BackendResult<Box<dyn PlayerBackend>>;

    fn create_recorder(
        &mut self,
        config: RecorderConfig,
        events: RecorderEvents,
    ) -> BackendResult<Box<dyn RecorderBackend>>;
}

/// Resolve a data source to a local file path
///
/// Plain paths and `file://` URLs are accepted; any other URL scheme is not.
pub(crate) fn local_path(source: Option<&str>) -> BackendResult<PathBuf> {
    let source = source
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BackendError::InvalidSource("no data source set".to_string()))?;

    if let Some(path) = source.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if source.contains("://") {
        return Err(BackendError::InvalidSource(format!(
            "{} is not a local file",
            source
        )));
    }
    Ok(PathBuf::from(source))
}

/// Open errors from hound keep their I/O cause
pub(crate) fn wav_error(e: hound::Error) -> BackendError {
    match e {
        hound::Error::IoError(io) => BackendError::Io(io),
        other => BackendError::Wav(other),
    }
}

/// Duration of a WAV file in milliseconds, read from its header
pub fn wav_duration_ms(path: &Path) -> BackendResult<i64> {
    let reader = hound::WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(BackendError::Failed(format!(
            "{} has a zero sample rate",
            path.display()
        )));
    }
    Ok(i64::from(reader.duration()) * 1000 / i64::from(spec.sample_rate))
}

/// Backend that plays and records WAV files
#[derive(Debug, Default, Clone, Copy)]
pub struct WavBackend;

impl WavBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MediaBackend for WavBackend {
    fn create_player(
        &mut self,
        config: PlayerConfig,
        events: PlayerEvents,
    ) -> BackendResult<Box<dyn PlayerBackend>> {
        Ok(Box::new(WavPlayer::new(config, events)?))
    }

    fn create_recorder(
        &mut self,
        config: RecorderConfig,
        events: RecorderEvents,
    ) -> BackendResult<Box<dyn RecorderBackend>> {
        Ok(Box::new(WavRecorder::new(config, events)?))
    }
}
