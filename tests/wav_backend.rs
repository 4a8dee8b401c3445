//! End-to-end tests driving the controller with the WAV backend
//!
//! Fixtures are written to temporary directories with hound so nothing
//! outside the test touches the filesystem.

use parking_lot::Mutex;
use playrec::audio::wav_duration_ms;
use playrec::controller::codes;
use playrec::{Controller, MediaError, State, WavBackend};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Write `millis` of a quiet 16 kHz mono tone
fn write_fixture(path: &Path, millis: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..(16 * millis) {
        let sample = ((i as f32 * 0.05).sin() * 1000.0) as i16;
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn controller() -> Controller {
    Controller::new(WavBackend::new()).with_tick_interval(Duration::from_millis(50))
}

/// Dispatch events until `until` holds for the controller
async fn drive(controller: &mut Controller, until: impl Fn(&Controller) -> bool) {
    while !until(controller) {
        let event = tokio::time::timeout(EVENT_TIMEOUT, controller.next_event())
            .await
            .expect("timed out waiting for an event")
            .expect("event queue closed");
        controller.dispatch(event);
    }
}

#[tokio::test]
async fn test_play_to_completion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_fixture(&path, 300);

    let mut controller = controller();
    let completions = Arc::new(Mutex::new(Vec::new()));
    let c = Arc::clone(&completions);
    controller.set_on_completion(move |success| c.lock().push(success));
    let ticks = Arc::new(Mutex::new(0u32));
    let t = Arc::clone(&ticks);
    controller.set_on_time_update(move |_| *t.lock() += 1);

    controller.set_data_source(path.to_string_lossy());
    assert_eq!(controller.play(), Ok(true));
    assert_eq!(controller.state(), State::PreparingToPlayAndPlaying);

    drive(&mut controller, |c| c.state() == State::Playing).await;
    assert_eq!(controller.duration(), 300);
    assert!(controller.is_ticking());

    let done = Arc::clone(&completions);
    drive(&mut controller, move |_| !done.lock().is_empty()).await;

    assert_eq!(controller.state(), State::Paused);
    assert_eq!(*completions.lock(), vec![true]);
    assert_eq!(controller.current_position(), 300);
    assert!(*ticks.lock() >= 1);
    controller.release();
}

#[tokio::test]
async fn test_seek_while_prepared() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_fixture(&path, 1000);

    let mut controller = controller();
    let seeks = Arc::new(Mutex::new(0u32));
    let s = Arc::clone(&seeks);
    controller.set_on_seek_complete(move || *s.lock() += 1);

    controller.set_data_source(path.to_string_lossy());
    assert_eq!(controller.prepare_to_play(), Ok(true));
    drive(&mut controller, |c| c.state() == State::PreparedToPlay).await;

    assert_eq!(controller.seek_to(400), Ok(true));
    assert_eq!(controller.state(), State::Paused);
    let done = Arc::clone(&seeks);
    drive(&mut controller, move |_| *done.lock() == 1).await;

    assert_eq!(controller.state(), State::Paused);
    assert_eq!(controller.current_position(), 400);
}

#[tokio::test]
async fn test_missing_file_reports_error() {
    let dir = TempDir::new().unwrap();

    let mut controller = controller();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&errors);
    controller.set_on_error(move |err| {
        e.lock().push(err);
        true
    });

    controller.set_data_source(dir.path().join("missing.wav").to_string_lossy());
    assert_eq!(controller.play(), Ok(true));

    let done = Arc::clone(&errors);
    drive(&mut controller, move |_| !done.lock().is_empty()).await;

    assert_eq!(controller.state(), State::None);
    assert_eq!(
        *errors.lock(),
        vec![MediaError::new(
            codes::MEDIA_ERROR_UNKNOWN,
            codes::MEDIA_ERROR_IO
        )]
    );
}

#[tokio::test]
async fn test_retry_after_missing_file_is_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("late.wav");

    let mut controller = controller();
    let errors = Arc::new(Mutex::new(0u32));
    let e = Arc::clone(&errors);
    controller.set_on_error(move |_| {
        *e.lock() += 1;
        true
    });

    controller.set_data_source(path.to_string_lossy());
    assert_eq!(controller.play(), Ok(true));
    let done = Arc::clone(&errors);
    drive(&mut controller, move |_| *done.lock() == 1).await;
    assert_eq!(controller.state(), State::None);

    write_fixture(&path, 1000);
    assert_eq!(controller.play(), Ok(true));
    drive(&mut controller, |c| c.state() == State::Playing).await;

    assert_eq!(controller.duration(), 1000);
    assert_eq!(*errors.lock(), 1);
    controller.release();
}

#[tokio::test]
async fn test_short_playback_reports_time() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blip.wav");
    write_fixture(&path, 100);

    let mut controller =
        Controller::new(WavBackend::new()).with_tick_interval(Duration::from_secs(10));
    let updates = Arc::new(Mutex::new(Vec::new()));
    let u = Arc::clone(&updates);
    controller.set_on_time_update(move |ms| u.lock().push(ms));
    let finished = Arc::new(Mutex::new(false));
    let f = Arc::clone(&finished);
    controller.set_on_completion(move |_| *f.lock() = true);

    controller.set_data_source(path.to_string_lossy());
    assert_eq!(controller.play(), Ok(true));
    let done = Arc::clone(&finished);
    drive(&mut controller, move |_| *done.lock()).await;

    assert_eq!(updates.lock().len(), 1);
}

#[tokio::test]
async fn test_record_until_max_duration() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("take.wav");

    let mut controller = controller();
    let completions = Arc::new(Mutex::new(Vec::new()));
    let c = Arc::clone(&completions);
    controller.set_on_completion(move |success| c.lock().push(success));

    controller.set_data_source(path.to_string_lossy());
    controller.set_max_duration(300);
    assert_eq!(controller.record(), Ok(true));
    assert_eq!(controller.state(), State::Recording);
    assert!(path.exists());

    let done = Arc::clone(&completions);
    drive(&mut controller, move |_| !done.lock().is_empty()).await;

    assert_eq!(controller.state(), State::None);
    assert_eq!(*completions.lock(), vec![true]);
    assert_eq!(wav_duration_ms(&path).unwrap(), 300);
}

#[tokio::test]
async fn test_pause_finalizes_recording() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("take.wav");

    let mut controller = controller();
    controller.set_data_source(path.to_string_lossy());
    assert_eq!(controller.record(), Ok(true));

    tokio::time::sleep(Duration::from_millis(250)).await;
    controller.pause();

    assert_eq!(controller.state(), State::None);
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().channels, 1);
}

#[tokio::test]
async fn test_recording_blocks_playback() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("take.wav");

    let mut controller = controller();
    controller.set_data_source(path.to_string_lossy());
    assert_eq!(controller.record(), Ok(true));

    let err = controller.play().unwrap_err();
    assert!(err.to_string().contains("current state: Recording"));
    assert_eq!(controller.state(), State::Recording);
    controller.release();
}
