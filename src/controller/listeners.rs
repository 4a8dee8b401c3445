//! Listener slots
//!
//! Each concern has at most one subscriber. Registering a new one replaces
//! the previous subscriber.

use super::events::MediaError;

/// Which device a prepared notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreparedKind {
    Playback,
    Recording,
}

/// Elapsed milliseconds: the player position while playing, time since
/// start while recording
pub type TimeUpdateListener = Box<dyn FnMut(u64) + Send>;
/// End of media, or recorder limit reached. `false` after an unhandled
/// recorder error.
pub type CompletionListener = Box<dyn FnMut(bool) + Send>;
pub type PreparedListener = Box<dyn FnMut(PreparedKind) + Send>;
pub type BufferingUpdateListener = Box<dyn FnMut(u8) + Send>;
pub type SeekListener = Box<dyn FnMut() + Send>;
/// Returns true when the error was handled
pub type ErrorListener = Box<dyn FnMut(MediaError) -> bool + Send>;

#[derive(Default)]
pub(crate) struct Listeners {
    pub time_update: Option<TimeUpdateListener>,
    pub completion: Option<CompletionListener>,
    pub prepared: Option<PreparedListener>,
    pub buffering: Option<BufferingUpdateListener>,
    pub seek: Option<SeekListener>,
    pub error: Option<ErrorListener>,
}

impl Listeners {
    pub fn time_update(&mut self, millis: u64) {
        if let Some(listener) = self.time_update.as_mut() {
            listener(millis);
        }
    }

    pub fn completion(&mut self, success: bool) {
        if let Some(listener) = self.completion.as_mut() {
            listener(success);
        }
    }

    pub fn prepared(&mut self, kind: PreparedKind) {
        if let Some(listener) = self.prepared.as_mut() {
            listener(kind);
        }
    }

    pub fn buffering(&mut self, percent: u8) {
        if let Some(listener) = self.buffering.as_mut() {
            listener(percent);
        }
    }

    pub fn seek_complete(&mut self) {
        if let Some(listener) = self.seek.as_mut() {
            listener();
        }
    }

    /// Absent listener counts as unhandled
    pub fn error(&mut self, error: MediaError) -> bool {
        match self.error.as_mut() {
            Some(listener) => listener(error),
            None => false,
        }
    }
}
