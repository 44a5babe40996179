//! Headless demo of the timer scheduler.
//!
//! Builds a `World` with [`WorldTime`], [`TimerScheduler`] and a
//! [`TypingEffect`] entity, then runs a fixed number of frames through a
//! `Schedule`. A small script pokes the scheduler at fixed frames:
//!
//! 1. frame 0: one-shot, repeating, countdown, realtime, chained and spam timers
//! 2. one third in: every timer is paused for one second of frames
//! 3. two thirds in: the time scale is halved (realtime timers do not care)
//! 4. last frame: repeating and orphaned timers are swept
//!
//! Everything observable is collected in a [`DemoReport`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bevy_ecs::prelude::*;
use log::{info, warn};
use serde::Serialize;

use crate::components::timer::{TimerBuilder, TimerHandle, TimerInfo};
use crate::components::typingeffect::{RevealMode, TypingEffect, TypingSpeed};
use crate::resources::simconfig::SimConfig;
use crate::resources::timerscheduler::TimerScheduler;
use crate::resources::worldtime::WorldTime;
use crate::systems::time::update_world_time;
use crate::systems::timers::update_timers;
use crate::systems::typingeffect::typing_effect_system;

/// Completion counters shared with timer callbacks.
#[derive(Debug, Clone, Default)]
struct DemoCounters {
    one_shot: Arc<AtomicU32>,
    repeating: Arc<AtomicU32>,
    beeps: Arc<AtomicU32>,
    realtime: Arc<AtomicU32>,
    chained: Arc<AtomicU32>,
    spam: Arc<AtomicU32>,
}

fn bump(counter: &Arc<AtomicU32>) -> impl FnMut() + Send + Sync + 'static {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handles the demo keeps so it can dispose its long-lived timers.
struct DemoHandles {
    repeating: TimerHandle,
    realtime: TimerHandle,
}

/// Outcome of a demo run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DemoReport {
    pub frames: u64,
    pub elapsed: f32,
    pub unscaled_elapsed: f32,
    pub one_shot_done: u32,
    pub repeating_done: u32,
    pub countdown_beeps: u32,
    pub realtime_done: u32,
    pub chained_done: u32,
    pub spam_done: u32,
    pub typed_text: String,
    pub disposed_repeating: usize,
    pub swept_orphans: usize,
    pub live_timers: usize,
    pub timers: Vec<TimerInfo>,
}

fn setup(world: &mut World, config: &SimConfig, counters: &DemoCounters) -> DemoHandles {
    let speed = TypingSpeed::from_name(&config.typing_speed).unwrap_or_else(|| {
        warn!(
            "Unknown typing speed '{}', using normal",
            config.typing_speed
        );
        TypingSpeed::Normal
    });
    let mut effect = TypingEffect::new(config.text.clone(), speed, RevealMode::Characters);

    let mut scheduler = world.resource_mut::<TimerScheduler>();

    let one_shot = counters.one_shot.clone();
    scheduler
        .once(3.0, move || {
            let n = one_shot.fetch_add(1, Ordering::Relaxed) + 1;
            info!("One-shot timer is done! Current count is {n}");
        })
        .forget();

    let repeating = scheduler.persistent(2.0, bump(&counters.repeating), true);

    scheduler
        .create(
            TimerBuilder::new(5.0)
                .on_second(bump(&counters.beeps))
                .on_complete(|| info!("Countdown finished")),
        )
        .forget();

    let realtime = scheduler.create(
        TimerBuilder::new(4.0)
            .realtime()
            .repeating()
            .persistent()
            .on_complete(bump(&counters.realtime)),
    );

    // Creating a timer from inside a callback goes through the command queue
    let commands = scheduler.commands();
    let chained = counters.chained.clone();
    scheduler
        .once(1.0, move || {
            let chained = chained.clone();
            commands
                .create(TimerBuilder::new(1.0).on_complete(move || {
                    chained.fetch_add(1, Ordering::Relaxed);
                }))
                .forget();
        })
        .forget();

    let mut rng = fastrand::Rng::with_seed(config.seed);
    for _ in 0..config.spam_timers {
        let duration = 0.5 + rng.f32() * 2.0;
        scheduler.once(duration, bump(&counters.spam)).forget();
    }

    // Stats printer whose handle is dropped on purpose; swept at the end
    let stats = counters.clone();
    drop(scheduler.persistent(
        5.0,
        move || {
            info!(
                "** one-shot={} repeating={} beeps={} spam={}",
                stats.one_shot.load(Ordering::Relaxed),
                stats.repeating.load(Ordering::Relaxed),
                stats.beeps.load(Ordering::Relaxed),
                stats.spam.load(Ordering::Relaxed)
            )
        },
        true,
    ));

    effect.begin(&mut scheduler);
    drop(scheduler);
    world.spawn(effect);

    DemoHandles {
        repeating,
        realtime,
    }
}

fn script(world: &mut World, frame: u64, config: &SimConfig) {
    let third = config.frames / 3;
    if third == 0 {
        return;
    }
    if frame == third {
        info!("Frame {frame}: pausing all timers");
        world.resource_mut::<TimerScheduler>().pause_all();
    }
    if frame == third + u64::from(config.fps) {
        info!("Frame {frame}: resuming all timers");
        world.resource_mut::<TimerScheduler>().unpause_all();
    }
    if frame == 2 * third {
        let mut wt = world.resource_mut::<WorldTime>();
        wt.time_scale *= 0.5;
        info!("Frame {frame}: time scale set to {}", wt.time_scale);
    }
}

/// Run the demo for `config.frames` frames and report what happened.
pub fn run(config: &SimConfig) -> DemoReport {
    let mut world = World::new();
    world.insert_resource(WorldTime::with_time_scale(config.time_scale));
    world.insert_resource(TimerScheduler::new());
    world.insert_resource(config.clone());

    let counters = DemoCounters::default();
    let handles = setup(&mut world, config, &counters);

    let mut schedule = Schedule::default();
    schedule.add_systems((update_timers, typing_effect_system).chain());

    let dt = config.frame_delta();
    for frame in 0..config.frames {
        script(&mut world, frame, config);
        update_world_time(&mut world, dt);
        schedule.run(&mut world);
    }

    let typed_text = {
        let mut query = world.query::<&TypingEffect>();
        query
            .iter(&world)
            .next()
            .map(|e| e.visible_text().to_string())
            .unwrap_or_default()
    };

    let mut report = DemoReport {
        typed_text,
        timers: world.resource::<TimerScheduler>().snapshots(),
        ..Default::default()
    };

    {
        let mut scheduler = world.resource_mut::<TimerScheduler>();
        scheduler.dispose(handles.realtime);
        report.swept_orphans = scheduler.sweep_orphans();
        report.disposed_repeating = scheduler.dispose_all_repeating();
        drop(handles.repeating);
        scheduler.tick(0.0, 0.0);
        report.live_timers = scheduler.len();
    }

    let wt = world.resource::<WorldTime>();
    report.frames = wt.frame_count;
    report.elapsed = wt.elapsed;
    report.unscaled_elapsed = wt.unscaled_elapsed;
    report.one_shot_done = counters.one_shot.load(Ordering::Relaxed);
    report.repeating_done = counters.repeating.load(Ordering::Relaxed);
    report.countdown_beeps = counters.beeps.load(Ordering::Relaxed);
    report.realtime_done = counters.realtime.load(Ordering::Relaxed);
    report.chained_done = counters.chained.load(Ordering::Relaxed);
    report.spam_done = counters.spam.load(Ordering::Relaxed);
    report
}
