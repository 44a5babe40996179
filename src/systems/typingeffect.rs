//! Typing effect system.
//!
//! Runs after [`update_timers`](crate::systems::timers::update_timers). For
//! every [`TypingEffect`] that is typing, reads how many times its timer has
//! completed and reveals that many characters or words. When the whole text
//! is visible the timer is disposed.

use bevy_ecs::prelude::*;
use log::debug;

use crate::components::typingeffect::TypingEffect;
use crate::resources::timerscheduler::TimerScheduler;

pub fn typing_effect_system(
    mut scheduler: ResMut<TimerScheduler>,
    mut query: Query<(Entity, &mut TypingEffect)>,
) {
    for (entity, mut effect) in query.iter_mut() {
        if !effect.is_typing() {
            continue;
        }
        let steps = effect
            .timer_id()
            .and_then(|id| scheduler.timer(id))
            .map(|timer| timer.completions());

        let Some(steps) = steps else {
            // Timer was disposed from outside (e.g. a sweep); stop where we are
            debug!("typing effect on {entity:?} lost its timer");
            drop(effect.finish());
            continue;
        };

        if effect.advance(steps) {
            debug!("typing effect on {entity:?} finished");
            if let Some(handle) = effect.finish() {
                scheduler.dispose(handle);
            }
        }
    }
}
