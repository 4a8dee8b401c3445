//! Error types
//!
//! `ControllerError` is the only error a caller of the controller ever sees.
//! `BackendError` is what media backends report; the controller logs it and
//! turns it into a boolean result or a routed event.

use crate::controller::{codes, Family, MediaError, State};
use thiserror::Error;

/// Errors returned by controller operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerError {
    /// A play operation was requested while recording, or the reverse
    #[error("{active} state conflicts with {requested} state (current state: {state:?})")]
    StateConflict {
        active: Family,
        requested: Family,
        state: State,
    },
}

impl ControllerError {
    pub(crate) fn conflict(state: State, requested: Family) -> Self {
        let active = match requested {
            Family::Playing => Family::Recording,
            Family::Recording => Family::Playing,
        };
        ControllerError::StateConflict {
            active,
            requested,
            state,
        }
    }
}

/// Errors reported by media backends
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid data source: {0}")]
    InvalidSource(String),

    #[error("Backend is not prepared")]
    NotPrepared,

    #[error("Backend has been released")]
    Released,

    #[error("Backend failure: {0}")]
    Failed(String),
}

impl BackendError {
    /// Error code pair used when this failure is routed to the error listener
    pub fn media_error(&self) -> MediaError {
        let extra = match self {
            BackendError::Io(_) => codes::MEDIA_ERROR_IO,
            BackendError::Wav(_) => codes::MEDIA_ERROR_MALFORMED,
            BackendError::InvalidSource(_) => codes::MEDIA_ERROR_UNSUPPORTED,
            BackendError::NotPrepared | BackendError::Released | BackendError::Failed(_) => 0,
        };
        MediaError::new(codes::MEDIA_ERROR_UNKNOWN, extra)
    }
}

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_families() {
        let err = ControllerError::conflict(State::Recording, Family::Playing);
        assert_eq!(
            err.to_string(),
            "Recording state conflicts with Playing state (current state: Recording)"
        );
    }

    #[test]
    fn test_io_failure_maps_to_io_extra() {
        let err = BackendError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(
            err.media_error(),
            MediaError::new(codes::MEDIA_ERROR_UNKNOWN, codes::MEDIA_ERROR_IO)
        );
    }
}
