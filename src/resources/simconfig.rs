//! Simulation configuration resource.
//!
//! Settings for the headless frame loop, loaded from an INI file. Defaults are
//! used for anything missing so the demo always starts.
//!
//! # Configuration File Format
//!
//! ```ini
//! [simulation]
//! fps = 60
//! frames = 900
//! time_scale = 1.0
//! seed = 7
//!
//! [demo]
//! spam_timers = 50
//! text = The quick brown fox jumps over the lazy dog.
//! typing_speed = normal
//! json = false
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::{info, warn};
use std::path::PathBuf;

const DEFAULT_FPS: u32 = 60;
const DEFAULT_FRAMES: u64 = 900;
const DEFAULT_TIME_SCALE: f32 = 1.0;
const DEFAULT_SEED: u64 = 7;
const DEFAULT_SPAM_TIMERS: u32 = 50;
const DEFAULT_TEXT: &str = "The quick brown fox jumps over the lazy dog.";
const DEFAULT_TYPING_SPEED: &str = "normal";
const DEFAULT_JSON: bool = false;
const DEFAULT_CONFIG_PATH: &str = "./framekit.ini";

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Simulated frames per second; the unscaled delta is `1 / fps`.
    pub fps: u32,
    /// Number of frames to run.
    pub frames: u64,
    /// Initial `WorldTime::time_scale`.
    pub time_scale: f32,
    /// Seed for the spam timer durations.
    pub seed: u64,
    /// How many short one-shot timers the demo creates at once.
    pub spam_timers: u32,
    /// Text revealed by the typing effect.
    pub text: String,
    /// Typing speed name, see [`TypingSpeed::from_name`](crate::components::typingeffect::TypingSpeed::from_name).
    pub typing_speed: String,
    /// Print the final report as JSON.
    pub json: bool,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self {
            fps: DEFAULT_FPS,
            frames: DEFAULT_FRAMES,
            time_scale: DEFAULT_TIME_SCALE,
            seed: DEFAULT_SEED,
            spam_timers: DEFAULT_SPAM_TIMERS,
            text: DEFAULT_TEXT.to_string(),
            typing_speed: DEFAULT_TYPING_SPEED.to_string(),
            json: DEFAULT_JSON,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Unscaled seconds per simulated frame.
    pub fn frame_delta(&self) -> f32 {
        1.0 / self.fps.max(1) as f32
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [simulation] section
        if let Some(fps) = config.getuint("simulation", "fps").ok().flatten() {
            match u32::try_from(fps) {
                Ok(fps) => self.fps = fps,
                Err(_) => warn!("Ignoring out of range fps {}", fps),
            }
        }
        if let Some(frames) = config.getuint("simulation", "frames").ok().flatten() {
            self.frames = frames;
        }
        if let Some(scale) = config.getfloat("simulation", "time_scale").ok().flatten() {
            self.time_scale = scale as f32;
        }
        if let Some(seed) = config.getuint("simulation", "seed").ok().flatten() {
            self.seed = seed;
        }

        // [demo] section
        if let Some(spam) = config.getuint("demo", "spam_timers").ok().flatten() {
            match u32::try_from(spam) {
                Ok(spam) => self.spam_timers = spam,
                Err(_) => warn!("Ignoring out of range spam_timers {}", spam),
            }
        }
        if let Some(text) = config.get("demo", "text") {
            self.text = text;
        }
        if let Some(speed) = config.get("demo", "typing_speed") {
            self.typing_speed = speed;
        }
        if let Some(json) = config.getbool("demo", "json").ok().flatten() {
            self.json = json;
        }

        info!(
            "Loaded config: fps={}, frames={}, time_scale={}, seed={}, spam_timers={}",
            self.fps, self.frames, self.time_scale, self.seed, self.spam_timers
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [simulation] section
        config.set("simulation", "fps", Some(self.fps.to_string()));
        config.set("simulation", "frames", Some(self.frames.to_string()));
        config.set("simulation", "time_scale", Some(self.time_scale.to_string()));
        config.set("simulation", "seed", Some(self.seed.to_string()));

        // [demo] section
        config.set("demo", "spam_timers", Some(self.spam_timers.to_string()));
        config.set("demo", "text", Some(self.text.clone()));
        config.set("demo", "typing_speed", Some(self.typing_speed.clone()));
        config.set("demo", "json", Some(self.json.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
