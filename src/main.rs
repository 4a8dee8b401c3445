//! Playrec - play and record WAV files from the command line
//!
//! Thin front end over the library's controller: it wires listeners to the
//! terminal and drives the controller's event queue until the session ends.

mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use cli::Command;
use log::{error, info};
use playrec::audio::wav_duration_ms;
use playrec::{Controller, PreparedKind, Recordings, Settings, State, WavBackend};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments and initialize logging
    let args = cli::Args::parse();
    cli::init_logging(&args);

    let settings_path = args.settings.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path);
    let recordings = match &settings.recordings_dir {
        Some(dir) => Recordings::new().with_dir(dir),
        None => Recordings::new(),
    };

    match args.command {
        Command::List => list(&recordings),
        Command::Play {
            file,
            looping,
            seek,
        } => play(&settings, file, looping, seek).await,
        Command::Record {
            file,
            max_duration,
            max_size,
        } => {
            let path = file.unwrap_or_else(|| recordings.generate_filename());
            record(&settings, path, max_duration, max_size).await
        }
    }
}

fn list(recordings: &Recordings) -> anyhow::Result<()> {
    let paths = recordings
        .list()
        .with_context(|| format!("Failed to list {}", recordings.dir().display()))?;

    for path in paths {
        match wav_duration_ms(&path) {
            Ok(ms) => println!("{}  {}", format_millis(ms), path.display()),
            Err(e) => println!("--:--.-  {} ({})", path.display(), e),
        }
    }
    Ok(())
}

async fn play(
    settings: &Settings,
    file: PathBuf,
    looping: bool,
    seek: Option<u32>,
) -> anyhow::Result<()> {
    let mut controller = Controller::from_settings(WavBackend::new(), settings);
    controller.set_data_source(file.to_string_lossy());
    controller.set_looping(looping || settings.looping);

    let done = Arc::new(AtomicBool::new(false));
    attach_listeners(&mut controller, &done);

    if !controller.play()? {
        bail!("Could not start playback of {}", file.display());
    }
    info!("Playing {}", file.display());

    run(&mut controller, &done, seek).await;
    Ok(())
}

async fn record(
    settings: &Settings,
    path: PathBuf,
    max_duration: Option<i32>,
    max_size: Option<i64>,
) -> anyhow::Result<()> {
    let mut controller = Controller::from_settings(WavBackend::new(), settings);
    controller.set_data_source(path.to_string_lossy());
    if let Some(max_duration) = max_duration {
        controller.set_max_duration(max_duration);
    }
    if let Some(max_size) = max_size {
        controller.set_max_file_size(max_size);
    }

    let done = Arc::new(AtomicBool::new(false));
    attach_listeners(&mut controller, &done);

    if !controller.record()? {
        bail!("Could not start recording to {}", path.display());
    }
    info!("Recording to {}", path.display());

    run(&mut controller, &done, None).await;
    println!("Saved {}", path.display());
    Ok(())
}

fn attach_listeners(controller: &mut Controller, done: &Arc<AtomicBool>) {
    let looping = controller.is_looping();
    let completion_done = Arc::clone(done);
    controller.set_on_completion(move |success| {
        info!("Completed (success: {})", success);
        if !looping || !success {
            completion_done.store(true, Ordering::SeqCst);
        }
    });

    let error_done = Arc::clone(done);
    controller.set_on_error(move |err| {
        error!("Media error: what={} extra={}", err.what, err.extra);
        error_done.store(true, Ordering::SeqCst);
        true
    });

    controller.set_on_prepared(|kind| match kind {
        PreparedKind::Playback => info!("Player prepared"),
        PreparedKind::Recording => info!("Recorder prepared"),
    });
    controller.set_on_time_update(|millis| println!("{}", format_millis(millis as i64)));
    controller.set_on_seek_complete(|| info!("Seek complete"));
}

/// Dispatch controller events until the session is done or Ctrl-C
async fn run(controller: &mut Controller, done: &AtomicBool, mut seek: Option<u32>) {
    while !done.load(Ordering::SeqCst) {
        let event = tokio::select! {
            event = controller.next_event() => event,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };

        match event {
            Some(event) => controller.dispatch(event),
            None => break,
        }

        if controller.state() == State::Playing {
            if let Some(offset) = seek.take() {
                if let Err(e) = controller.seek_to(offset) {
                    error!("Seek failed: {}", e);
                }
            }
        }
    }

    controller.pause();
    controller.release();
}

fn format_millis(millis: i64) -> String {
    let seconds = millis.max(0) / 1000;
    format!(
        "{:02}:{:02}.{}",
        seconds / 60,
        seconds % 60,
        (millis.max(0) % 1000) / 100
    )
}
