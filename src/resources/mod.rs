//! ECS resources made available to systems.
//!
//! Overview
//! - `simconfig` – settings for the headless frame loop, loaded from INI
//! - `timerscheduler` – registry that owns and ticks every timer
//! - `worldtime` – scaled and unscaled frame time
pub mod simconfig;
pub mod timerscheduler;
pub mod worldtime;
