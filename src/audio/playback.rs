//! WAV file player
//!
//! Simulates playback of a WAV file against a monotonic clock: the header is
//! probed when preparing, and the position advances in real time while
//! started. No audio is sent to an output device.

use super::{local_path, wav_duration_ms, PlayerBackend, PlayerConfig};
use crate::controller::{codes, MediaError, PlayerEvent, PlayerEvents};
use crate::error::{BackendError, BackendResult};
use crate::tokio_runtime;
use log::{debug, warn};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Playback clock shared with the background tasks
#[derive(Debug, Default)]
struct Timeline {
    /// Known once prepared
    duration_ms: Option<i64>,
    /// Position when the clock was last started or moved
    base_ms: i64,
    started_at: Option<Instant>,
    looping: bool,
}

impl Timeline {
    fn position(&self) -> i64 {
        let elapsed = self
            .started_at
            .map_or(0, |started| started.elapsed().as_millis() as i64);
        let position = self.base_ms + elapsed;
        match self.duration_ms {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    fn remaining(&self) -> Duration {
        let duration = self.duration_ms.unwrap_or(0);
        Duration::from_millis((duration - self.position()).max(0) as u64)
    }

    /// Freeze the clock at the current position
    fn hold(&mut self) {
        self.base_ms = self.position();
        self.started_at = None;
    }

    /// End of media: rewind and keep running when looping, otherwise stop
    /// at the end
    fn finish(&mut self) {
        if self.looping {
            self.base_ms = 0;
            self.started_at = Some(Instant::now());
        } else {
            self.base_ms = self.duration_ms.unwrap_or(self.base_ms);
            self.started_at = None;
        }
    }
}

/// Player backend for local WAV files
pub struct WavPlayer {
    path: PathBuf,
    events: PlayerEvents,
    timeline: Arc<Mutex<Timeline>>,
    prepare_task: Option<JoinHandle<()>>,
    end_task: Option<JoinHandle<()>>,
    released: bool,
}

impl WavPlayer {
    pub fn new(config: PlayerConfig, events: PlayerEvents) -> BackendResult<Self> {
        let path = local_path(config.source.as_deref())?;
        let timeline = Timeline {
            looping: config.looping,
            ..Timeline::default()
        };

        Ok(Self {
            path,
            events,
            timeline: Arc::new(Mutex::new(timeline)),
            prepare_task: None,
            end_task: None,
            released: false,
        })
    }

    fn ensure_live(&self) -> BackendResult<()> {
        if self.released {
            Err(BackendError::Released)
        } else {
            Ok(())
        }
    }

    fn ensure_prepared(&self) -> BackendResult<()> {
        self.ensure_live()?;
        if self.timeline.lock().duration_ms.is_none() {
            return Err(BackendError::NotPrepared);
        }
        Ok(())
    }

    /// Arm the timer that reports the end of media
    fn schedule_end(&mut self) {
        self.cancel_end();

        let remaining = self.timeline.lock().remaining();
        let timeline = Arc::clone(&self.timeline);
        let events = self.events.clone();
        self.end_task = tokio_runtime::spawn(async move {
            tokio::time::sleep(remaining).await;
            timeline.lock().finish();
            events.emit(PlayerEvent::Completion);
        });
    }

    fn cancel_end(&mut self) {
        if let Some(task) = self.end_task.take() {
            task.abort();
        }
    }
}

impl PlayerBackend for WavPlayer {
    fn prepare_async(&mut self) -> BackendResult<()> {
        self.ensure_live()?;
        let handle = tokio_runtime::handle()
            .ok_or_else(|| BackendError::Failed("no runtime to prepare on".to_string()))?;

        let path = self.path.clone();
        let timeline = Arc::clone(&self.timeline);
        let events = self.events.clone();
        self.prepare_task = Some(handle.spawn_blocking(move || {
            match wav_duration_ms(&path) {
                Ok(duration) => {
                    debug!("Prepared {} ({}ms)", path.display(), duration);
                    timeline.lock().duration_ms = Some(duration);
                    events.emit(PlayerEvent::Prepared);
                    events.emit(PlayerEvent::BufferingUpdate(100));
                }
                Err(e) => {
                    warn!("Failed to prepare {}: {}", path.display(), e);
                    let extra = e.media_error().extra;
                    events.emit(PlayerEvent::Error(MediaError::new(
                        codes::MEDIA_ERROR_UNKNOWN,
                        extra,
                    )));
                }
            }
        }));
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        self.ensure_prepared()?;
        {
            let mut timeline = self.timeline.lock();
            if !timeline.is_running() {
                if timeline.remaining().is_zero() {
                    timeline.base_ms = 0;
                }
                timeline.started_at = Some(Instant::now());
            }
        }
        self.schedule_end();
        Ok(())
    }

    fn pause(&mut self) -> BackendResult<()> {
        self.ensure_live()?;
        self.cancel_end();
        self.timeline.lock().hold();
        Ok(())
    }

    fn seek_to(&mut self, offset_ms: u32) -> BackendResult<()> {
        self.ensure_prepared()?;
        let running = {
            let mut timeline = self.timeline.lock();
            let duration = timeline.duration_ms.unwrap_or(0);
            timeline.base_ms = i64::from(offset_ms).min(duration);
            if timeline.is_running() {
                timeline.started_at = Some(Instant::now());
            }
            timeline.is_running()
        };
        if running {
            self.schedule_end();
        }
        self.events.emit(PlayerEvent::SeekComplete);
        Ok(())
    }

    fn set_looping(&mut self, looping: bool) {
        self.timeline.lock().looping = looping;
    }

    fn current_position(&self) -> i64 {
        self.timeline.lock().position()
    }

    fn duration(&self) -> i64 {
        self.timeline.lock().duration_ms.unwrap_or(-1)
    }

    fn release(&mut self) {
        self.cancel_end();
        if let Some(task) = self.prepare_task.take() {
            task.abort();
        }
        self.timeline.lock().hold();
        self.released = true;
    }
}

impl Drop for WavPlayer {
    fn drop(&mut self) {
        self.cancel_end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_clamps_to_duration() {
        let timeline = Timeline {
            duration_ms: Some(500),
            base_ms: 900,
            ..Timeline::default()
        };
        assert_eq!(timeline.position(), 500);
        assert!(timeline.remaining().is_zero());
    }

    #[test]
    fn test_finish_rewinds_when_looping() {
        let mut timeline = Timeline {
            duration_ms: Some(500),
            base_ms: 500,
            looping: true,
            ..Timeline::default()
        };
        timeline.finish();
        assert!(timeline.is_running());
        assert!(timeline.position() < 500);

        timeline.looping = false;
        timeline.finish();
        assert!(!timeline.is_running());
        assert_eq!(timeline.position(), 500);
    }

    #[test]
    fn test_hold_freezes_position() {
        let mut timeline = Timeline {
            duration_ms: Some(10_000),
            base_ms: 1200,
            ..Timeline::default()
        };
        timeline.hold();
        assert_eq!(timeline.position(), 1200);
        assert!(!timeline.is_running());
    }
}
