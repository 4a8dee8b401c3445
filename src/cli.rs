//! Command-line interface for Playrec
//!
//! Handles argument parsing and logging configuration.

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

/// Playrec - play and record WAV files through a single controller
#[derive(Parser, Debug)]
#[command(name = "playrec")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (defaults to the user config dir)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a WAV file
    Play {
        file: PathBuf,

        /// Start over when the end is reached
        #[arg(long = "loop")]
        looping: bool,

        /// Seek to this offset (milliseconds) once playing
        #[arg(long)]
        seek: Option<u32>,
    },
    /// Record to a WAV file until a limit is reached or Ctrl-C
    Record {
        /// Output file; a new file in the recordings directory if omitted
        file: Option<PathBuf>,

        /// Stop after this many milliseconds
        #[arg(long)]
        max_duration: Option<i32>,

        /// Stop once the file reaches this many bytes
        #[arg(long)]
        max_size: Option<i64>,
    },
    /// List recordings, newest first
    List,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);

    // Set playrec modules to requested verbosity level
    builder.filter_module("playrec", args.log_level());

    builder.format_timestamp_millis().init();
}
