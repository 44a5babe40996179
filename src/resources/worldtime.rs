//! Frame time resource.
//!
//! [`WorldTime`] is the host tick source for the timer scheduler: every frame
//! it holds a scaled delta (affected by `time_scale`) and an unscaled delta.
use bevy_ecs::prelude::Resource;

#[derive(Resource, Debug, Clone, Copy)]
pub struct WorldTime {
    /// Accumulated scaled time in seconds.
    pub elapsed: f32,
    /// Accumulated unscaled time in seconds.
    pub unscaled_elapsed: f32,
    /// Scaled delta of the current frame.
    pub delta: f32,
    /// Unscaled delta of the current frame.
    pub unscaled_delta: f32,
    pub time_scale: f32,
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            unscaled_elapsed: 0.0,
            delta: 0.0,
            unscaled_delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    /// Start with a custom time scale.
    pub fn with_time_scale(time_scale: f32) -> Self {
        WorldTime {
            time_scale,
            ..Default::default()
        }
    }
}
