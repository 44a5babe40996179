//! framekit demo entry point.
//!
//! Runs the headless frame loop from [`framekit::demo`] with settings from an
//! INI file and command-line overrides, then prints a summary (or a JSON
//! report with `--json`).
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --frames 1200 --time-scale 0.5
//! RUST_LOG=framekit=trace cargo run -- --json
//! ```

use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

use framekit::demo;
use framekit::resources::simconfig::SimConfig;

/// framekit: frame-driven timers demo
#[derive(Parser)]
#[command(version, about = "Runs the frame-driven timer scheduler demo headless.")]
struct Cli {
    /// INI configuration file (default: ./framekit.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Initial time scale applied to scaled timers.
    #[arg(long, value_name = "X")]
    time_scale: Option<f32>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    write_config: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => SimConfig::with_path(path),
        None => SimConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        warn!("Config file not found or invalid, using defaults: {}", e);
    }
    if let Some(frames) = cli.frames {
        config.frames = frames;
    }
    if let Some(scale) = cli.time_scale {
        config.time_scale = scale;
    }
    if cli.json {
        config.json = true;
    }

    // Early-exit: persist config and quit
    if cli.write_config {
        if let Err(e) = config.save_to_file() {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        println!("Config written to {}", config.config_path.display());
        return;
    }

    info!(
        "Running {} frames at {} fps (time scale {})",
        config.frames, config.fps, config.time_scale
    );
    let report = demo::run(&config);

    if config.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    info!(
        "Simulated {:.2}s ({:.2}s unscaled) over {} frames",
        report.elapsed, report.unscaled_elapsed, report.frames
    );
    info!(
        "one-shot={} repeating={} beeps={} realtime={} chained={} spam={}",
        report.one_shot_done,
        report.repeating_done,
        report.countdown_beeps,
        report.realtime_done,
        report.chained_done,
        report.spam_done
    );
    info!("Typed: \"{}\"", report.typed_text);
    info!(
        "Swept {} orphan(s), disposed {} repeating, {} timer(s) left",
        report.swept_orphans, report.disposed_repeating, report.live_timers
    );
}
