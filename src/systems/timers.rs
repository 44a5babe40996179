//! Timer scheduler system.
//!
//! # System Flow
//!
//! Each frame, after [`update_world_time`](crate::systems::time::update_world_time):
//!
//! 1. `update_timers` reads the scaled and unscaled deltas from `WorldTime`
//! 2. The [`TimerScheduler`] registers staged timers and ticks every live one
//! 3. Expired timers and timers disposed during the pass are removed
//!
//! Realtime timers count down with the unscaled delta, so pausing the game by
//! setting `time_scale = 0` freezes only the scaled ones.

use bevy_ecs::prelude::*;

use crate::resources::timerscheduler::TimerScheduler;
use crate::resources::worldtime::WorldTime;

/// Tick the [`TimerScheduler`] once with this frame's deltas.
pub fn update_timers(world_time: Res<WorldTime>, mut scheduler: ResMut<TimerScheduler>) {
    scheduler.tick(world_time.delta, world_time.unscaled_delta);
}
