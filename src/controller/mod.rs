//! Player/recorder controller
//!
//! One state machine in front of two mutually exclusive devices. The
//! controller lazily creates the player or the recorder through a
//! [`MediaBackend`], validates every request against the current [`State`],
//! and turns backend events into state transitions followed by listener
//! notifications.
//!
//! All work happens on whoever owns the controller. Backends and the progress
//! ticker only queue [`ControllerEvent`]s; the owner drains the queue with
//! [`Controller::pump`] or awaits [`Controller::next_event`] and passes each
//! event to [`Controller::dispatch`].

mod events;
mod listeners;
mod state;
pub mod ticker;


use crate::audio::{
    MediaBackend, PlayerBackend, PlayerConfig, RecorderBackend, RecorderConfig, StreamKind,
    RECORDER_CHANNELS, RECORDER_SAMPLE_RATE,
};
use crate::error::{BackendError, BackendResult, ControllerError};
use crate::settings::Settings;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub use events::{
    codes, ControllerEvent, EventSender, HandleId, MediaError, PlayerEvent, PlayerEvents,
    RecorderEvent, RecorderEvents,
};
pub use listeners::PreparedKind;
pub use state::{Family, State};
pub use ticker::ProgressTicker;

use listeners::Listeners;

/// A backend device together with the id stamped on its events
struct Live<T: ?Sized> {
    id: HandleId,
    device: Box<T>,
    /// Set once the device reported it is prepared
    prepared: bool,
}

/// Coordinates one player and one recorder behind a single state machine
pub struct Controller {
    backend: Box<dyn MediaBackend>,
    state: State,
    last_state: State,
    data_source: Option<String>,
    looping: bool,
    max_duration: i32,
    max_file_size: i64,
    player: Option<Live<dyn PlayerBackend>>,
    recorder: Option<Live<dyn RecorderBackend>>,
    started_at: Option<Instant>,
    ticker: ProgressTicker,
    listeners: Listeners,
    sender: EventSender,
    receiver: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl Controller {
    pub fn new(backend: impl MediaBackend + 'static) -> Self {
        let (sender, receiver) = EventSender::channel();
        Self {
            backend: Box::new(backend),
            state: State::None,
            last_state: State::None,
            data_source: None,
            looping: false,
            max_duration: 0,
            max_file_size: 0,
            player: None,
            recorder: None,
            started_at: None,
            ticker: ProgressTicker::default(),
            listeners: Listeners::default(),
            sender,
            receiver,
        }
    }

    /// Create a controller using the defaults from `settings`
    pub fn from_settings(backend: impl MediaBackend + 'static, settings: &Settings) -> Self {
        let mut controller = Self::new(backend)
            .with_tick_interval(Duration::from_millis(settings.tick_interval_ms.max(1)));
        controller.looping = settings.looping;
        controller.max_duration = settings.max_duration_ms;
        controller.max_file_size = settings.max_file_size_bytes;
        controller
    }

    /// Set the interval between time updates
    pub fn with_tick_interval(mut self, period: Duration) -> Self {
        self.ticker.stop();
        self.ticker = ProgressTicker::new(period);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!("State {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Prepares the player for playback, asynchronously
    ///
    /// Returns whether preparation was initiated; playback itself has not
    /// started when this returns. Fails when the recorder is active.
    pub fn prepare_to_play(&mut self) -> Result<bool, ControllerError> {
        match self.state {
            State::None | State::Paused => self.set_state(State::PreparingToPlay),
            State::Error => {
                warn!("prepare_to_play in error state, release first");
                return Ok(false);
            }
            state if state.is_play_family() => return Ok(true),
            state => return Err(ControllerError::conflict(state, Family::Playing)),
        }

        if self.player.is_none() {
            if let Err(e) = self.open_player() {
                error!("Failed to prepare player: {}", e);
                self.release_player();
                self.set_state(State::None);
                return Ok(false);
            }
        } else if self.player_ready() {
            self.set_state(State::PreparedToPlay);
        }
        // Otherwise the earlier prepare request is still in flight

        Ok(true)
    }

    fn player_ready(&self) -> bool {
        self.player.as_ref().map_or(false, |live| live.prepared)
    }

    fn open_player(&mut self) -> BackendResult<()> {
        let id = HandleId::next();
        let config = PlayerConfig {
            source: self.data_source.clone(),
            looping: self.looping,
            stream: StreamKind::Music,
        };
        let mut device = self
            .backend
            .create_player(config, PlayerEvents::new(id, self.sender.clone()))?;
        info!("Created player {:?} for {:?}", id, self.data_source);

        // Keep the handle even if prepare fails so the caller's cleanup
        // releases it
        let prepared = device.prepare_async();
        self.player = Some(Live {
            id,
            device,
            prepared: false,
        });
        prepared
    }

    /// Prepares the recorder, blocking until it is ready
    ///
    /// Returns false when no data source is set or the recorder could not be
    /// prepared. Fails when the player is active.
    pub fn prepare_to_record(&mut self) -> Result<bool, ControllerError> {
        if self.data_source.as_deref().map_or(true, str::is_empty) {
            warn!("prepare_to_record without a data source");
            return Ok(false);
        }

        match self.state {
            State::None | State::Paused => {
                self.release();
                self.set_state(State::PreparingToRecord);
            }
            State::Error => {
                warn!("prepare_to_record in error state, release first");
                return Ok(false);
            }
            state if state.is_record_family() => return Ok(true),
            state => return Err(ControllerError::conflict(state, Family::Recording)),
        }

        if let Err(e) = self.open_recorder() {
            error!("Failed to prepare recorder: {}", e);
            self.pause();
            return Ok(false);
        }

        let escalated = self.state == State::PreparingToRecordAndRecording;
        self.set_state(State::PreparedToRecord);
        self.listeners.prepared(PreparedKind::Recording);

        if escalated {
            self.record()?;
        }

        Ok(true)
    }

    fn open_recorder(&mut self) -> BackendResult<()> {
        if self.recorder.is_none() {
            let id = HandleId::next();
            let config = RecorderConfig {
                output: self.data_source.clone().unwrap_or_default(),
                max_duration_ms: self.max_duration,
                max_file_size: self.max_file_size,
                sample_rate: RECORDER_SAMPLE_RATE,
                channels: RECORDER_CHANNELS,
            };
            let device = self
                .backend
                .create_recorder(config, RecorderEvents::new(id, self.sender.clone()))?;
            info!("Created recorder {:?} for {:?}", id, self.data_source);
            self.recorder = Some(Live {
                id,
                device,
                prepared: false,
            });
        }

        match self.recorder.as_mut() {
            Some(live) => {
                live.device.prepare()?;
                live.prepared = true;
                Ok(())
            }
            None => Err(BackendError::Released),
        }
    }

    /// Starts or resumes playback
    ///
    /// From `None` this prepares first; if preparation is still running the
    /// request is remembered and playback starts once the player is prepared.
    pub fn play(&mut self) -> Result<bool, ControllerError> {
        match self.state {
            State::None => {
                if self.prepare_to_play()? {
                    self.play()
                } else {
                    Ok(false)
                }
            }
            State::Playing | State::PreparingToPlayAndPlaying => Ok(true),
            State::PreparingToPlay => {
                self.set_state(State::PreparingToPlayAndPlaying);
                Ok(true)
            }
            State::Paused if !self.player_ready() => {
                // Paused while preparing: wait for the player again
                if self.prepare_to_play()? {
                    self.play()
                } else {
                    Ok(false)
                }
            }
            State::Paused | State::PreparedToPlay => Ok(self.start_player()),
            State::Error => Ok(false),
            state => Err(ControllerError::conflict(state, Family::Playing)),
        }
    }

    fn start_player(&mut self) -> bool {
        self.set_state(State::Playing);
        self.start_time_update();

        let started = match self.player.as_mut() {
            Some(live) => live.device.start(),
            None => Err(BackendError::Released),
        };
        match started {
            Ok(()) => true,
            Err(e) => {
                self.fail_start(Family::Playing, e);
                false
            }
        }
    }

    /// Begins capturing to the data source
    pub fn record(&mut self) -> Result<bool, ControllerError> {
        match self.state {
            State::None | State::Paused => {
                if self.prepare_to_record()? {
                    self.record()
                } else {
                    Ok(false)
                }
            }
            State::Recording | State::PreparingToRecordAndRecording => Ok(true),
            State::PreparingToRecord => {
                self.set_state(State::PreparingToRecordAndRecording);
                Ok(true)
            }
            State::PreparedToRecord => Ok(self.start_recorder()),
            State::Error => Ok(false),
            state => Err(ControllerError::conflict(state, Family::Recording)),
        }
    }

    fn start_recorder(&mut self) -> bool {
        self.set_state(State::Recording);
        self.start_time_update();

        let started = match self.recorder.as_mut() {
            Some(live) => live.device.start(),
            None => Err(BackendError::Released),
        };
        match started {
            Ok(()) => true,
            Err(e) => {
                self.fail_start(Family::Recording, e);
                false
            }
        }
    }

    /// A device refused to start: park in `Error` and report it the same way
    /// a runtime error from that device would be reported
    fn fail_start(&mut self, family: Family, e: BackendError) {
        error!("Failed to start {:?} device: {}", family, e);
        self.stop_time_update();
        self.set_state(State::Error);

        let handled = self.listeners.error(e.media_error());
        if family == Family::Recording && !handled {
            self.listeners.completion(false);
        }
    }

    /// Pauses playback or stops recording. Safe in any state.
    ///
    /// A recording cannot be resumed: the recorder is released and the
    /// controller goes back to `None`.
    pub fn pause(&mut self) {
        let state = self.state;
        if state.is_play_family() {
            if let Some(live) = self.player.as_mut() {
                if let Err(e) = live.device.pause() {
                    warn!("Player pause failed: {}", e);
                }
            }
            self.stop_time_update();
            self.set_state(State::Paused);
        } else if state.is_record_family() {
            self.release();
        }
    }

    /// Seeks the player to `offset_ms`
    ///
    /// Playback is paused while seeking and resumes on seek completion if it
    /// was playing. Returns false when there is no player to seek.
    pub fn seek_to(&mut self, offset_ms: u32) -> Result<bool, ControllerError> {
        if self.state.is_record_family() {
            return Err(ControllerError::conflict(self.state, Family::Playing));
        }
        if self.player.is_none() {
            return Ok(false);
        }

        self.last_state = self.state;
        self.pause();

        let sought = match self.player.as_mut() {
            Some(live) => live.device.seek_to(offset_ms),
            None => Err(BackendError::Released),
        };
        match sought {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Seek to {}ms failed: {}", offset_ms, e);
                Ok(false)
            }
        }
    }

    /// Releases the player and the recorder and returns to `None`
    pub fn release(&mut self) {
        self.release_player();
        self.release_recorder();
        self.stop_time_update();
        self.set_state(State::None);
    }

    fn release_player(&mut self) {
        if let Some(mut live) = self.player.take() {
            live.device.release();
            info!("Released player {:?}", live.id);
        }
    }

    fn release_recorder(&mut self) {
        if let Some(mut live) = self.recorder.take() {
            if let Err(e) = live.device.stop() {
                warn!("Recorder stop failed: {}", e);
            }
            live.device.release();
            info!("Released recorder {:?}", live.id);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        if let Some(live) = self.player.as_mut() {
            live.device.set_looping(looping);
        }
    }

    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    /// Sets the file path or URL to play from or record to
    ///
    /// Any open player or recorder is released first, so play/record has to
    /// be called again afterwards.
    pub fn set_data_source(&mut self, source: impl Into<String>) {
        self.release();
        self.data_source = Some(source.into());
    }

    pub fn max_duration(&self) -> i32 {
        self.max_duration
    }

    pub fn set_max_duration(&mut self, max_duration_ms: i32) {
        self.max_duration = max_duration_ms;
        if let Some(live) = self.recorder.as_mut() {
            live.device.set_max_duration(max_duration_ms);
        }
    }

    pub fn max_file_size(&self) -> i64 {
        self.max_file_size
    }

    pub fn set_max_file_size(&mut self, max_file_size: i64) {
        self.max_file_size = max_file_size;
        if let Some(live) = self.recorder.as_mut() {
            live.device.set_max_file_size(max_file_size);
        }
    }

    /// Playback position in milliseconds, or -1 without a player
    pub fn current_position(&self) -> i64 {
        self.player
            .as_ref()
            .map_or(-1, |live| live.device.current_position())
    }

    /// Media duration in milliseconds, or -1 when unavailable
    pub fn duration(&self) -> i64 {
        self.player.as_ref().map_or(-1, |live| live.device.duration())
    }

    pub fn set_on_time_update(&mut self, listener: impl FnMut(u64) + Send + 'static) {
        self.listeners.time_update = Some(Box::new(listener));
    }

    /// Without a time-update listener the ticker stops at its next tick
    pub fn clear_on_time_update(&mut self) {
        self.listeners.time_update = None;
    }

    pub fn set_on_completion(&mut self, listener: impl FnMut(bool) + Send + 'static) {
        self.listeners.completion = Some(Box::new(listener));
    }

    pub fn set_on_prepared(&mut self, listener: impl FnMut(PreparedKind) + Send + 'static) {
        self.listeners.prepared = Some(Box::new(listener));
    }

    pub fn set_on_buffering_update(&mut self, listener: impl FnMut(u8) + Send + 'static) {
        self.listeners.buffering = Some(Box::new(listener));
    }

    pub fn set_on_seek_complete(&mut self, listener: impl FnMut() + Send + 'static) {
        self.listeners.seek = Some(Box::new(listener));
    }

    pub fn set_on_error(&mut self, listener: impl FnMut(MediaError) -> bool + Send + 'static) {
        self.listeners.error = Some(Box::new(listener));
    }

    pub fn clear_on_error(&mut self) {
        self.listeners.error = None;
    }

    /// Drop every registered listener
    pub fn clear_listeners(&mut self) {
        self.listeners = Listeners::default();
    }

    /// A sender into this controller's event queue
    pub fn event_sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Whether the progress ticker is running
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    /// Dispatch every queued event without waiting. Returns how many were
    /// dispatched.
    pub fn pump(&mut self) -> usize {
        let mut dispatched = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.dispatch(event);
            dispatched += 1;
        }
        dispatched
    }

    /// Wait for the next queued event
    ///
    /// The controller keeps a sender of its own, so this only returns `None`
    /// if the queue was closed.
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.receiver.recv().await
    }

    /// Apply one event to the state machine
    ///
    /// Events from a player or recorder that has since been released are
    /// dropped, as are ticks from a stopped ticker.
    pub fn dispatch(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Player { handle, event } => {
                if self.player.as_ref().map(|live| live.id) == Some(handle) {
                    self.on_player_event(event);
                } else {
                    debug!("Dropping {:?} from stale player {:?}", event, handle);
                }
            }
            ControllerEvent::Recorder { handle, event } => {
                if self.recorder.as_ref().map(|live| live.id) == Some(handle) {
                    self.on_recorder_event(event);
                } else {
                    debug!("Dropping {:?} from stale recorder {:?}", event, handle);
                }
            }
            ControllerEvent::Tick { generation } => {
                if self.ticker.is_current(generation) {
                    self.on_tick();
                }
            }
        }
    }

    fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Prepared => self.on_player_prepared(),
            PlayerEvent::Error(err) => {
                error!("Player error: what={} extra={}", err.what, err.extra);
                if self.player_ready() {
                    self.pause();
                } else {
                    // Failed to prepare: drop the player so a retry starts over
                    self.release();
                }
                let handled = self.listeners.error(err);
                debug!("Player error handled: {}", handled);
            }
            PlayerEvent::Completion => {
                if self.state == State::Playing && self.looping {
                    self.restart_player();
                } else {
                    self.pause();
                }
                self.listeners.completion(true);
            }
            PlayerEvent::SeekComplete => {
                if self.last_state == State::Playing {
                    if let Err(e) = self.play() {
                        warn!("Could not resume after seek: {}", e);
                    }
                }
                self.listeners.seek_complete();
            }
            PlayerEvent::BufferingUpdate(percent) => self.listeners.buffering(percent),
        }
    }

    fn on_player_prepared(&mut self) {
        if let Some(live) = self.player.as_mut() {
            live.prepared = true;
        }

        let previous = self.state;
        self.set_state(State::PreparedToPlay);
        if previous == State::PreparingToPlayAndPlaying {
            self.start_player();
        }
        self.listeners.prepared(PreparedKind::Playback);
    }

    fn restart_player(&mut self) {
        debug!("Looping, restarting playback");
        let restarted = match self.player.as_mut() {
            Some(live) => live.device.start(),
            None => Err(BackendError::Released),
        };
        if let Err(e) = restarted {
            self.fail_start(Family::Playing, e);
        }
    }

    fn on_recorder_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Error(err) => self.on_recorder_error(err),
            RecorderEvent::Info(info) => match info.what {
                codes::MEDIA_RECORDER_INFO_MAX_DURATION_REACHED
                | codes::MEDIA_RECORDER_INFO_MAX_FILESIZE_REACHED => {
                    info!("Recorder limit reached ({})", info.what);
                    self.pause();
                    self.listeners.completion(true);
                }
                _ => self.on_recorder_error(info),
            },
        }
    }

    fn on_recorder_error(&mut self, err: MediaError) {
        error!("Recorder error: what={} extra={}", err.what, err.extra);
        self.pause();
        if !self.listeners.error(err) {
            self.listeners.completion(false);
        }
    }

    fn on_tick(&mut self) {
        if self.listeners.time_update.is_none() {
            debug!("No time update listener, stopping ticker");
            self.stop_time_update();
            return;
        }

        let millis = match self.state {
            State::Playing => self
                .player
                .as_ref()
                .map(|live| live.device.current_position().max(0) as u64),
            State::Recording => self
                .started_at
                .map(|started| started.elapsed().as_millis() as u64),
            _ => None,
        };

        if let Some(millis) = millis {
            self.listeners.time_update(millis);
        }
    }

    fn start_time_update(&mut self) {
        self.started_at = Some(Instant::now());
        self.ticker.start(self.sender.clone());
    }

    fn stop_time_update(&mut self) {
        self.ticker.stop();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.release_player();
        self.release_recorder();
    }
}
