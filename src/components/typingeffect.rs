//! Typing effect component revealing a text over time.
//!
//! [`TypingEffect`] holds a text and how much of it is currently visible. When
//! started with [`TypingEffect::begin`] it registers a repeating timer in the
//! [`TimerScheduler`]; every completion of that timer reveals one more
//! character (or word). The
//! [`typing_effect_system`](crate::systems::typingeffect::typing_effect_system)
//! reads the timer each frame and updates the visible count.
//!
//! # Speeds
//!
//! | Speed      | Seconds per character |
//! |------------|-----------------------|
//! | `Instant`  | whole text at once    |
//! | `Blazing`  | one per frame         |
//! | `VeryFast` | 0.01                  |
//! | `Fast`     | 0.02                  |
//! | `Normal`   | 0.04                  |
//! | `Slow`     | 0.06                  |
//! | `VerySlow` | 0.1                   |
//! | `Glacial`  | 0.2                   |
//!
//! Word reveal uses the same table multiplied by [`WORD_INTERVAL_FACTOR`], so
//! a paragraph takes roughly as long either way.
//!
//! [`TimerScheduler`]: crate::resources::timerscheduler::TimerScheduler

use bevy_ecs::prelude::Component;

use crate::components::timer::{TimerBuilder, TimerHandle, TimerId};
use crate::resources::timerscheduler::TimerScheduler;

/// Interval multiplier when revealing whole words.
pub const WORD_INTERVAL_FACTOR: f32 = 8.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingSpeed {
    Instant,
    Blazing,
    VeryFast,
    Fast,
    #[default]
    Normal,
    Slow,
    VerySlow,
    Glacial,
}

impl TypingSpeed {
    /// Delay between two revealed characters.
    pub fn seconds_per_char(self) -> f32 {
        match self {
            TypingSpeed::Instant | TypingSpeed::Blazing => 0.0,
            TypingSpeed::VeryFast => 0.01,
            TypingSpeed::Fast => 0.02,
            TypingSpeed::Normal => 0.04,
            TypingSpeed::Slow => 0.06,
            TypingSpeed::VerySlow => 0.1,
            TypingSpeed::Glacial => 0.2,
        }
    }

    /// Parse a speed name, case-insensitive. Used by the demo config.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "instant" => Some(TypingSpeed::Instant),
            "blazing" => Some(TypingSpeed::Blazing),
            "veryfast" => Some(TypingSpeed::VeryFast),
            "fast" => Some(TypingSpeed::Fast),
            "normal" => Some(TypingSpeed::Normal),
            "slow" => Some(TypingSpeed::Slow),
            "veryslow" => Some(TypingSpeed::VerySlow),
            "glacial" => Some(TypingSpeed::Glacial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealMode {
    #[default]
    Characters,
    Words,
}

/// Text revealed progressively by a scheduler timer.
#[derive(Component, Debug)]
pub struct TypingEffect {
    text: String,
    pub speed: TypingSpeed,
    pub mode: RevealMode,
    visible: usize,
    typing: bool,
    reveal_all: bool,
    clear_pending: bool,
    /// Timer completions already consumed before the last `clear`.
    step_base: usize,
    timer: Option<TimerHandle>,
}

impl TypingEffect {
    pub fn new(text: impl Into<String>, speed: TypingSpeed, mode: RevealMode) -> Self {
        TypingEffect {
            text: text.into(),
            speed,
            mode,
            visible: 0,
            typing: false,
            reveal_all: false,
            clear_pending: false,
            step_base: 0,
            timer: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Total number of characters in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Number of characters currently visible.
    pub fn visible_chars(&self) -> usize {
        self.visible
    }

    /// The visible prefix of the text.
    pub fn visible_text(&self) -> &str {
        match self.text.char_indices().nth(self.visible) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Id of the timer driving the effect, while typing.
    pub fn timer_id(&self) -> Option<TimerId> {
        self.timer.as_ref().map(TimerHandle::id)
    }

    /// Seconds between two reveal steps for the current speed and mode.
    pub fn step_interval(&self) -> f32 {
        let base = self.speed.seconds_per_char();
        match self.mode {
            RevealMode::Characters => base,
            RevealMode::Words => base * WORD_INTERVAL_FACTOR,
        }
    }

    /// Hide everything and start revealing from the beginning.
    pub fn begin(&mut self, scheduler: &mut TimerScheduler) {
        self.stop(scheduler);
        self.visible = 0;
        self.reveal_all = false;
        self.clear_pending = false;
        self.step_base = 0;
        if self.speed == TypingSpeed::Instant {
            self.visible = self.char_count();
            return;
        }
        self.typing = true;
        self.timer = Some(
            scheduler.create(
                TimerBuilder::new(self.step_interval())
                    .repeating()
                    .persistent(),
            ),
        );
    }

    /// Stop typing and release the driving timer. The visible part stays.
    pub fn stop(&mut self, scheduler: &mut TimerScheduler) {
        if let Some(handle) = self.timer.take() {
            scheduler.dispose(handle);
        }
        self.typing = false;
    }

    /// Reveal the rest of the text on the next system run.
    pub fn reveal_all(&mut self) {
        self.reveal_all = true;
    }

    /// Hide all characters; typing, if running, restarts the reveal from the
    /// first character on the next step.
    pub fn clear(&mut self) {
        self.visible = 0;
        self.clear_pending = self.typing;
    }

    /// Replace the text. Stops any running effect and hides everything.
    pub fn set_text(&mut self, text: impl Into<String>, scheduler: &mut TimerScheduler) {
        self.stop(scheduler);
        self.text = text.into();
        self.visible = 0;
    }

    /// Update the visible count after `steps` reveal steps.
    ///
    /// Returns `true` once the whole text is visible.
    pub(crate) fn advance(&mut self, steps: u32) -> bool {
        let steps = steps as usize;
        if self.clear_pending {
            self.clear_pending = false;
            self.step_base = steps;
            self.visible = 0;
        }
        let steps = steps.saturating_sub(self.step_base);
        let total = self.char_count();
        let target = if self.reveal_all {
            total
        } else {
            match self.mode {
                RevealMode::Characters => steps.min(total),
                RevealMode::Words => chars_through_word(&self.text, steps),
            }
        };
        self.visible = self.visible.max(target);
        self.visible >= total
    }

    /// Finish typing and hand back the timer for disposal.
    pub(crate) fn finish(&mut self) -> Option<TimerHandle> {
        self.typing = false;
        self.reveal_all = false;
        self.timer.take()
    }
}

/// Characters up to the end of the `words`-th whitespace-separated word.
/// The last word extends to the end of the text.
fn chars_through_word(text: &str, words: usize) -> usize {
    if words == 0 {
        return 0;
    }
    let mut seen = 0;
    let mut in_word = false;
    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            if in_word {
                seen += 1;
                in_word = false;
                if seen == words {
                    return i;
                }
            }
        } else {
            in_word = true;
        }
    }
    text.chars().count()
}
