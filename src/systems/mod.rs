//! Frame systems.
//!
//! Submodules overview
//! - [`time`] – update scaled and unscaled frame time
//! - [`timers`] – tick the timer scheduler
//! - [`typingeffect`] – reveal typing-effect text from its timer

pub mod time;
pub mod timers;
pub mod typingeffect;
