//! Composite player/recorder state
//!
//! The controller is always in exactly one of these states. Play and record
//! states form two families that can never be active at the same time.

use std::fmt;

/// Current state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// Nothing prepared. Also where a paused recording ends up, since the
    /// recorder has no paused state of its own.
    #[default]
    None,
    /// A synchronous backend start failed; only `release()` leaves this state
    Error,
    /// Player paused
    Paused,
    /// Player playing
    Playing,
    /// Player preparing
    PreparingToPlay,
    /// Player prepared, not started
    PreparedToPlay,
    /// Player preparing, playback starts as soon as it is prepared
    PreparingToPlayAndPlaying,
    /// Recorder recording
    Recording,
    /// Recorder preparing
    PreparingToRecord,
    /// Recorder prepared, not started
    PreparedToRecord,
    /// Recorder preparing, recording starts as soon as it is prepared
    PreparingToRecordAndRecording,
}

/// Which of the two mutually exclusive device families a state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Playing,
    Recording,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Playing => f.write_str("Playing"),
            Family::Recording => f.write_str("Recording"),
        }
    }
}

impl State {
    /// Every state, in declaration order
    pub const ALL: [State; 11] = [
        State::None,
        State::Error,
        State::Paused,
        State::Playing,
        State::PreparingToPlay,
        State::PreparedToPlay,
        State::PreparingToPlayAndPlaying,
        State::Recording,
        State::PreparingToRecord,
        State::PreparedToRecord,
        State::PreparingToRecordAndRecording,
    ];

    /// The family this state belongs to. `None`, `Paused` and `Error` belong
    /// to neither.
    pub fn family(self) -> Option<Family> {
        match self {
            State::Playing
            | State::PreparingToPlay
            | State::PreparedToPlay
            | State::PreparingToPlayAndPlaying => Some(Family::Playing),
            State::Recording
            | State::PreparingToRecord
            | State::PreparedToRecord
            | State::PreparingToRecordAndRecording => Some(Family::Recording),
            State::None | State::Error | State::Paused => None,
        }
    }

    pub fn is_play_family(self) -> bool {
        self.family() == Some(Family::Playing)
    }

    pub fn is_record_family(self) -> bool {
        self.family() == Some(Family::Recording)
    }

    /// Playing, or about to play as soon as preparation finishes
    pub fn is_playing(self) -> bool {
        matches!(self, State::Playing | State::PreparingToPlayAndPlaying)
    }

    /// Recording, or about to record as soon as preparation finishes
    pub fn is_recording(self) -> bool {
        matches!(self, State::Recording | State::PreparingToRecordAndRecording)
    }

    /// States in which the progress ticker runs
    pub fn is_ticking(self) -> bool {
        matches!(self, State::Playing | State::Recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families_are_disjoint() {
        for state in State::ALL {
            assert!(!(state.is_play_family() && state.is_record_family()));
        }
        let play = State::ALL.iter().filter(|s| s.is_play_family()).count();
        let record = State::ALL.iter().filter(|s| s.is_record_family()).count();
        assert_eq!(play, 4);
        assert_eq!(record, 4);
    }

    #[test]
    fn test_idle_states_have_no_family() {
        assert_eq!(State::None.family(), None);
        assert_eq!(State::Paused.family(), None);
        assert_eq!(State::Error.family(), None);
    }

    #[test]
    fn test_active_predicates_include_escalation() {
        assert!(State::PreparingToPlayAndPlaying.is_playing());
        assert!(!State::PreparingToPlay.is_playing());
        assert!(State::PreparingToRecordAndRecording.is_recording());
        assert!(!State::PreparedToRecord.is_recording());
    }
}
