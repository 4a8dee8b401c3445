//! Events flowing into the controller
//!
//! Backends and the progress ticker never touch controller state directly.
//! They push `ControllerEvent`s into the controller's queue and the owner of
//! the controller dispatches them one at a time.

use log::trace;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Media error and info codes, as reported by backends
pub mod codes {
    pub const MEDIA_ERROR_UNKNOWN: i32 = 1;
    pub const MEDIA_ERROR_SERVER_DIED: i32 = 100;

    pub const MEDIA_ERROR_IO: i32 = -1004;
    pub const MEDIA_ERROR_MALFORMED: i32 = -1007;
    pub const MEDIA_ERROR_UNSUPPORTED: i32 = -1010;
    pub const MEDIA_ERROR_TIMED_OUT: i32 = -110;

    pub const MEDIA_RECORDER_ERROR_UNKNOWN: i32 = 1;
    pub const MEDIA_RECORDER_INFO_UNKNOWN: i32 = 1;
    pub const MEDIA_RECORDER_INFO_MAX_DURATION_REACHED: i32 = 800;
    pub const MEDIA_RECORDER_INFO_MAX_FILESIZE_REACHED: i32 = 801;
}

/// Error reported by a backend: the error type and an implementation
/// specific extra code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaError {
    pub what: i32,
    pub extra: i32,
}

impl MediaError {
    pub fn new(what: i32, extra: i32) -> Self {
        Self { what, extra }
    }
}

/// Identity of one backend instance
///
/// A fresh id is allocated every time the controller creates a player or a
/// recorder, so events from an already released instance can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

impl HandleId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Events emitted by a player backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Prepared,
    Error(MediaError),
    Completion,
    SeekComplete,
    /// Percentage 0-100 of the content buffered so far
    BufferingUpdate(u8),
}

/// Events emitted by a recorder backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderEvent {
    Error(MediaError),
    Info(MediaError),
}

/// Everything the controller's event queue carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    Player { handle: HandleId, event: PlayerEvent },
    Recorder { handle: HandleId, event: RecorderEvent },
    Tick { generation: u64 },
}

/// Sending half of the controller's event queue
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl EventSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event. Returns false once the controller is gone.
    pub fn send(&self, event: ControllerEvent) -> bool {
        trace!("Queueing {:?}", event);
        self.tx.send(event).is_ok()
    }
}

/// Event sink handed to a player backend on creation
#[derive(Debug, Clone)]
pub struct PlayerEvents {
    handle: HandleId,
    sender: EventSender,
}

impl PlayerEvents {
    pub(crate) fn new(handle: HandleId, sender: EventSender) -> Self {
        Self { handle, sender }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn emit(&self, event: PlayerEvent) -> bool {
        self.sender.send(ControllerEvent::Player {
            handle: self.handle,
            event,
        })
    }
}

/// Event sink handed to a recorder backend on creation
#[derive(Debug, Clone)]
pub struct RecorderEvents {
    handle: HandleId,
    sender: EventSender,
}

impl RecorderEvents {
    pub(crate) fn new(handle: HandleId, sender: EventSender) -> Self {
        Self { handle, sender }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn emit(&self, event: RecorderEvent) -> bool {
        self.sender.send(ControllerEvent::Recorder {
            handle: self.handle,
            event,
        })
    }
}
