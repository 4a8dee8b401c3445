//! WAV file recording using hound
//!
//! `WavRecorder` writes 16-bit PCM at the configured rate and channel count.
//! There is no capture device behind it: while started it appends silence in
//! real time, which is enough to exercise limits and file handling.
//! `Recordings` manages the directory new recordings go to.

use super::{local_path, wav_error, RecorderBackend, RecorderConfig};
use crate::controller::{codes, MediaError, RecorderEvent, RecorderEvents};
use crate::error::{BackendError, BackendResult};
use crate::tokio_runtime;
use hound::{WavSpec, WavWriter};
use log::{debug, error};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Length of each block of samples appended while recording
const BLOCK_MS: u64 = 100;
/// Size of a canonical PCM WAV header
const WAV_HEADER_BYTES: i64 = 44;

type Writer = WavWriter<BufWriter<File>>;

/// What the capture task needs, shared with the recorder
struct Capture {
    writer: Option<Writer>,
    frames_written: u64,
    max_duration_ms: i32,
    max_file_size: i64,
}

impl Capture {
    fn elapsed_ms(&self, sample_rate: u32) -> u64 {
        self.frames_written * 1000 / u64::from(sample_rate.max(1))
    }

    fn file_size(&self, spec: &WavSpec) -> i64 {
        let bytes_per_frame = i64::from(spec.channels) * i64::from(spec.bits_per_sample / 8);
        WAV_HEADER_BYTES + self.frames_written as i64 * bytes_per_frame
    }

    /// The info code of the first limit reached, if any
    fn limit_reached(&self, spec: &WavSpec) -> Option<i32> {
        if self.max_duration_ms > 0
            && self.elapsed_ms(spec.sample_rate) >= self.max_duration_ms as u64
        {
            return Some(codes::MEDIA_RECORDER_INFO_MAX_DURATION_REACHED);
        }
        if self.max_file_size > 0 && self.file_size(spec) >= self.max_file_size {
            return Some(codes::MEDIA_RECORDER_INFO_MAX_FILESIZE_REACHED);
        }
        None
    }
}

/// Recorder backend writing WAV files
pub struct WavRecorder {
    path: PathBuf,
    spec: WavSpec,
    events: RecorderEvents,
    capture: Arc<Mutex<Capture>>,
    task: Option<JoinHandle<()>>,
    released: bool,
}

impl WavRecorder {
    pub fn new(config: RecorderConfig, events: RecorderEvents) -> BackendResult<Self> {
        let path = local_path(Some(&config.output))?;
        let spec = WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        Ok(Self {
            path,
            spec,
            events,
            capture: Arc::new(Mutex::new(Capture {
                writer: None,
                frames_written: 0,
                max_duration_ms: config.max_duration_ms,
                max_file_size: config.max_file_size,
            })),
            task: None,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_live(&self) -> BackendResult<()> {
        if self.released {
            Err(BackendError::Released)
        } else {
            Ok(())
        }
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn finalize(&mut self) -> BackendResult<()> {
        let writer = self.capture.lock().writer.take();
        if let Some(writer) = writer {
            writer.finalize()?;
            debug!("Finalized {}", self.path.display());
        }
        Ok(())
    }
}

/// Append one block of silence, then report a reached limit or a failure
///
/// Returns false when capturing has to end.
fn capture_block(
    capture: &Mutex<Capture>,
    spec: &WavSpec,
    events: &RecorderEvents,
) -> bool {
    let mut capture = capture.lock();
    let frames = u64::from(spec.sample_rate) * BLOCK_MS / 1000;

    let Some(writer) = capture.writer.as_mut() else {
        return false;
    };
    for _ in 0..frames * u64::from(spec.channels) {
        if let Err(e) = writer.write_sample(0i16) {
            error!("Failed to write sample: {}", e);
            events.emit(RecorderEvent::Error(MediaError::new(
                codes::MEDIA_RECORDER_ERROR_UNKNOWN,
                codes::MEDIA_ERROR_IO,
            )));
            return false;
        }
    }
    capture.frames_written += frames;

    match capture.limit_reached(spec) {
        Some(what) => {
            events.emit(RecorderEvent::Info(MediaError::new(what, 0)));
            false
        }
        None => true,
    }
}

impl RecorderBackend for WavRecorder {
    fn prepare(&mut self) -> BackendResult<()> {
        self.ensure_live()?;
        let mut capture = self.capture.lock();
        if capture.writer.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        capture.writer = Some(WavWriter::create(&self.path, self.spec).map_err(wav_error)?);
        capture.frames_written = 0;
        debug!("Recorder prepared at {}", self.path.display());
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        self.ensure_live()?;
        if self.capture.lock().writer.is_none() {
            return Err(BackendError::NotPrepared);
        }
        if self.task.is_some() {
            return Ok(());
        }

        let capture = Arc::clone(&self.capture);
        let spec = self.spec;
        let events = self.events.clone();
        self.task = tokio_runtime::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(BLOCK_MS));
            interval.tick().await;
            loop {
                interval.tick().await;
                if !capture_block(&capture, &spec, &events) {
                    break;
                }
            }
        });

        if self.task.is_none() {
            return Err(BackendError::Failed("no runtime to record on".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.ensure_live()?;
        self.stop_task();
        self.finalize()
    }

    fn set_max_duration(&mut self, max_duration_ms: i32) {
        self.capture.lock().max_duration_ms = max_duration_ms;
    }

    fn set_max_file_size(&mut self, max_file_size: i64) {
        self.capture.lock().max_file_size = max_file_size;
    }

    fn release(&mut self) {
        self.stop_task();
        if let Err(e) = self.finalize() {
            error!("Failed to finalize {}: {}", self.path.display(), e);
        }
        self.released = true;
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        self.stop_task();
    }
}

/// Directory of recordings
pub struct Recordings {
    dir: PathBuf,
}

impl Recordings {
    /// Recordings under the user's local data directory
    pub fn new() -> Self {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playrec")
            .join("recordings");

        Self { dir }
    }

    /// Use a different recordings directory
    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure the recordings directory exists
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Generate a unique filename for a new recording
    pub fn generate_filename(&self) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        self.dir.join(format!("recording_{}_{}.wav", timestamp, &uuid[..8]))
    }

    /// All WAV files in the directory, newest first
    pub fn list(&self) -> BackendResult<Vec<PathBuf>> {
        self.ensure_dir()?;

        let mut recordings: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase() == "wav")
                    .unwrap_or(false)
            })
            .collect();

        recordings.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        Ok(recordings)
    }
}

impl Default for Recordings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_duration_limit() {
        let capture = Capture {
            writer: None,
            frames_written: 16000,
            max_duration_ms: 1000,
            max_file_size: 0,
        };
        assert_eq!(
            capture.limit_reached(&spec()),
            Some(codes::MEDIA_RECORDER_INFO_MAX_DURATION_REACHED)
        );
    }

    #[test]
    fn test_file_size_limit() {
        let capture = Capture {
            writer: None,
            frames_written: 100,
            max_duration_ms: 0,
            max_file_size: 244,
        };
        assert_eq!(capture.file_size(&spec()), 244);
        assert_eq!(
            capture.limit_reached(&spec()),
            Some(codes::MEDIA_RECORDER_INFO_MAX_FILESIZE_REACHED)
        );
    }

    #[test]
    fn test_no_limits() {
        let capture = Capture {
            writer: None,
            frames_written: u64::from(u32::MAX),
            max_duration_ms: 0,
            max_file_size: -1,
        };
        assert_eq!(capture.limit_reached(&spec()), None);
    }

    #[test]
    fn test_generated_names_are_unique_wavs() {
        let recordings = Recordings::new().with_dir("/tmp/playrec-test");
        let a = recordings.generate_filename();
        let b = recordings.generate_filename();
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "wav");
        assert!(a.starts_with("/tmp/playrec-test"));
    }

    #[test]
    fn test_list_only_wavs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"").unwrap();
        std::fs::write(dir.path().join("c.WAV"), b"").unwrap();

        let recordings = Recordings::new().with_dir(dir.path());
        let listed = recordings.list().unwrap();
        assert_eq!(listed.len(), 2);
    }
}
