//! framekit library.
//!
//! A cooperative, frame-driven timer scheduler for game loops built on
//! `bevy_ecs`, plus a typing-effect widget driven by it.
//!
//! - [`components`] – the [`Timer`](components::timer::Timer) model and the typing effect
//! - [`resources`] – the [`TimerScheduler`](resources::timerscheduler::TimerScheduler), frame time and config
//! - [`systems`] – per-frame systems advancing time, timers and typing effects
//! - [`demo`] – headless frame loop used by the `framekit` binary

pub mod components;
pub mod demo;
pub mod resources;
pub mod systems;
