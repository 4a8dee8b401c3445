//! Playrec - one state machine for an audio player and an audio recorder
//!
//! The [`Controller`] owns both devices, makes sure they are never active at
//! the same time, and turns their asynchronous callbacks into a single
//! ordered stream of state transitions and listener notifications.
//!
//! Devices are created through a [`MediaBackend`]. [`WavBackend`] is a
//! file based implementation that needs no platform audio stack.

pub mod audio;
pub mod controller;
pub mod error;
pub mod settings;
pub mod tokio_runtime;

pub use audio::{MediaBackend, PlayerBackend, RecorderBackend, Recordings, WavBackend};
pub use controller::{
    Controller, ControllerEvent, Family, MediaError, PlayerEvent, PreparedKind, RecorderEvent,
    State,
};
pub use error::{BackendError, ControllerError};
pub use settings::Settings;
