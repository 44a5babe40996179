//! Timer scheduler integration tests.
//!
//! These drive the scheduler the way a game loop does: `update_world_time`
//! followed by a `Schedule` running `update_timers` (and the typing effect
//! system where relevant).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bevy_ecs::prelude::*;

use framekit::components::timer::TimerBuilder;
use framekit::components::typingeffect::{RevealMode, TypingEffect, TypingSpeed};
use framekit::resources::timerscheduler::TimerScheduler;
use framekit::resources::worldtime::WorldTime;
use framekit::systems::time::update_world_time;
use framekit::systems::timers::update_timers;
use framekit::systems::typingeffect::typing_effect_system;

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn make_world() -> World {
    let mut world = World::new();
    world.insert_resource(WorldTime::default());
    world.insert_resource(TimerScheduler::new());
    world
}

fn make_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((update_timers, typing_effect_system).chain());
    schedule
}

fn step(world: &mut World, schedule: &mut Schedule, dt: f32) {
    update_world_time(world, dt);
    schedule.run(world);
}

fn counter() -> (Arc<AtomicU32>, impl FnMut() + Send + Sync + 'static) {
    let count = Arc::new(AtomicU32::new(0));
    let c = count.clone();
    (count, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

fn scheduler(world: &mut World) -> Mut<'_, TimerScheduler> {
    world.resource_mut::<TimerScheduler>()
}

#[test]
fn new_timer_is_full_before_first_tick() {
    let mut world = make_world();
    let h = scheduler(&mut world).create(TimerBuilder::new(2.5));
    let s = world.resource::<TimerScheduler>();
    let t = s.timer(h.id()).unwrap();
    assert_eq!(t.remaining(), 2.5);
    assert!(!t.is_complete());
}

#[test]
fn one_shot_fires_once_and_leaves_live_set() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    let ticks = Arc::new(AtomicU32::new(0));
    let t = ticks.clone();
    let h = scheduler(&mut world).create(
        TimerBuilder::new(1.0)
            .on_complete(cb)
            .on_update(move |_| {
                t.fetch_add(1, Ordering::SeqCst);
            }),
    );

    for _ in 0..4 {
        step(&mut world, &mut schedule, 0.5);
    }

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    let s = world.resource::<TimerScheduler>();
    assert!(!s.contains(h.id()));
    assert!(s.is_empty());
}

#[test]
fn repeating_timer_fires_twice_in_four_seconds() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    let h = scheduler(&mut world).persistent(2.0, cb, true);

    for _ in 0..4 {
        step(&mut world, &mut schedule, 1.0);
    }

    assert_eq!(fired.load(Ordering::SeqCst), 2);
    let s = world.resource::<TimerScheduler>();
    assert!(s.contains(h.id()));
    assert_eq!(s.timer(h.id()).unwrap().completions(), 2);
}

#[test]
fn repeating_non_persistent_timer_keeps_running() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    let h = scheduler(&mut world).create(TimerBuilder::new(1.0).repeating().on_complete(cb));

    for _ in 0..3 {
        step(&mut world, &mut schedule, 1.0);
    }

    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert!(world.resource::<TimerScheduler>().contains(h.id()));
}

#[test]
fn paused_timer_is_frozen_and_resumes_exactly() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let updates = Arc::new(AtomicU32::new(0));
    let u = updates.clone();
    let (seconds, on_second) = counter();
    let h = scheduler(&mut world).create(
        TimerBuilder::new(3.0)
            .on_update(move |_| {
                u.fetch_add(1, Ordering::SeqCst);
            })
            .on_second(on_second),
    );

    step(&mut world, &mut schedule, 0.5);
    assert!(scheduler(&mut world).pause(h.id()));
    for _ in 0..5 {
        step(&mut world, &mut schedule, 1.0);
    }
    {
        let s = world.resource::<TimerScheduler>();
        let t = s.timer(h.id()).unwrap();
        assert!(t.is_paused());
        assert_eq!(t.remaining(), 2.5);
    }
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert_eq!(seconds.load(Ordering::SeqCst), 0);

    assert!(scheduler(&mut world).unpause(h.id()));
    step(&mut world, &mut schedule, 0.25);
    let s = world.resource::<TimerScheduler>();
    assert!(approx_eq(s.timer(h.id()).unwrap().remaining(), 2.25));
    assert_eq!(updates.load(Ordering::SeqCst), 2);
}

#[test]
fn cancel_resets_and_halts() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    let h = scheduler(&mut world).once(1.0, cb);

    step(&mut world, &mut schedule, 0.75);
    assert!(scheduler(&mut world).cancel(h.id()));
    step(&mut world, &mut schedule, 0.75);

    let s = world.resource::<TimerScheduler>();
    let t = s.timer(h.id()).unwrap();
    assert!(t.is_paused());
    assert_eq!(t.remaining(), 1.0);
    assert!(!t.is_complete());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn create_and_dispose_before_tick_is_never_ticked() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    let updates = Arc::new(AtomicU32::new(0));
    let u = updates.clone();
    let h = scheduler(&mut world).create(TimerBuilder::new(0.0).on_complete(cb).on_update(
        move |_| {
            u.fetch_add(1, Ordering::SeqCst);
        },
    ));
    let id = h.id();
    assert!(scheduler(&mut world).dispose(h));

    step(&mut world, &mut schedule, 1.0);

    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(updates.load(Ordering::SeqCst), 0);
    assert!(!world.resource::<TimerScheduler>().contains(id));
}

#[test]
fn on_second_fires_five_times_with_unaligned_ticks() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (seconds, cb) = counter();
    let h = scheduler(&mut world).create(TimerBuilder::new(5.0).on_second(cb));

    let mut last = 0;
    for _ in 0..20 {
        step(&mut world, &mut schedule, 0.3);
        let now = seconds.load(Ordering::SeqCst);
        assert!(now - last <= 1, "more than one firing in a tick");
        last = now;
    }

    assert_eq!(seconds.load(Ordering::SeqCst), 5);
    assert!(!world.resource::<TimerScheduler>().contains(h.id()));
}

#[test]
fn on_millisecond_tracks_tenths() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (tenths, cb) = counter();
    let _h = scheduler(&mut world).create(TimerBuilder::new(1.0).on_millisecond(cb));

    for _ in 0..8 {
        step(&mut world, &mut schedule, 0.125);
    }

    // one firing per tick; the two skipped tenths are not made up later
    assert_eq!(tenths.load(Ordering::SeqCst), 8);
}

#[test]
fn long_frame_does_not_leave_threshold_backlog() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (seconds, cb) = counter();
    let _h = scheduler(&mut world).create(TimerBuilder::new(10.0).on_second(cb));

    step(&mut world, &mut schedule, 3.05);
    assert_eq!(seconds.load(Ordering::SeqCst), 1);
    for _ in 0..3 {
        step(&mut world, &mut schedule, 0.01);
    }
    assert_eq!(seconds.load(Ordering::SeqCst), 1);
}

#[test]
fn dispose_all_repeating_leaves_one_shots() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let r1 = scheduler(&mut world).persistent(1.0, || {}, true);
    let r2 = scheduler(&mut world).create(TimerBuilder::new(0.5).repeating());
    let one = scheduler(&mut world).once(10.0, || {});
    step(&mut world, &mut schedule, 0.1);

    assert_eq!(scheduler(&mut world).dispose_all_repeating(), 2);

    let s = world.resource::<TimerScheduler>();
    assert!(!s.contains(r1.id()));
    assert!(!s.contains(r2.id()));
    assert!(s.contains(one.id()));
    assert_eq!(s.len(), 1);
}

#[test]
fn dispose_all_repeating_drops_staged_timers() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    let staged = scheduler(&mut world).create(TimerBuilder::new(0.5).repeating().on_complete(cb));
    let one = scheduler(&mut world).once(10.0, || {});

    assert_eq!(scheduler(&mut world).dispose_all_repeating(), 1);
    assert_eq!(world.resource::<TimerScheduler>().pending_len(), 1);

    step(&mut world, &mut schedule, 1.0);
    let s = world.resource::<TimerScheduler>();
    assert!(!s.contains(staged.id()));
    assert!(s.contains(one.id()));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn queued_set_duration_and_restart_apply_next_tick() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    let h = scheduler(&mut world).persistent(1.0, cb, true);
    let commands = scheduler(&mut world).commands();
    step(&mut world, &mut schedule, 0.5);

    commands.set_duration(h.id(), 3.0);
    commands.restart(h.id(), false);
    {
        // nothing happens until the scheduler drains the queue
        let s = world.resource::<TimerScheduler>();
        assert_eq!(s.timer(h.id()).unwrap().duration(), 1.0);
    }
    step(&mut world, &mut schedule, 0.5);
    {
        let s = world.resource::<TimerScheduler>();
        let t = s.timer(h.id()).unwrap();
        assert_eq!(t.duration(), 3.0);
        assert_eq!(t.remaining(), 2.5);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    commands.restart(h.id(), true);
    step(&mut world, &mut schedule, 1.0);
    let s = world.resource::<TimerScheduler>();
    let t = s.timer(h.id()).unwrap();
    assert!(t.is_paused());
    assert_eq!(t.remaining(), 3.0);
}

#[test]
fn pause_all_skips_timers_created_this_frame() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let old = scheduler(&mut world).once(5.0, || {});
    step(&mut world, &mut schedule, 0.1);

    let fresh = scheduler(&mut world).once(5.0, || {});
    scheduler(&mut world).pause_all();
    step(&mut world, &mut schedule, 1.0);

    let s = world.resource::<TimerScheduler>();
    assert!(s.timer(old.id()).unwrap().is_paused());
    let fresh = s.timer(fresh.id()).unwrap();
    assert!(!fresh.is_paused());
    assert_eq!(fresh.remaining(), 4.0);
}

#[test]
fn cancel_all_resets_registered_timers() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let a = scheduler(&mut world).once(2.0, || {});
    let b = scheduler(&mut world).create(TimerBuilder::new(3.0).realtime());
    step(&mut world, &mut schedule, 1.0);

    scheduler(&mut world).cancel_all();
    step(&mut world, &mut schedule, 1.0);

    let s = world.resource::<TimerScheduler>();
    assert_eq!(s.timer(a.id()).unwrap().remaining(), 2.0);
    assert_eq!(s.timer(b.id()).unwrap().remaining(), 3.0);
    assert!(s.timer(b.id()).unwrap().is_paused());
}

#[test]
fn realtime_timer_ignores_time_scale() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    world.resource_mut::<WorldTime>().time_scale = 0.0;
    let (scaled_fired, scaled_cb) = counter();
    let (real_fired, real_cb) = counter();
    let _scaled = scheduler(&mut world).once(1.0, scaled_cb);
    let _real = scheduler(&mut world).create(TimerBuilder::new(1.0).realtime().on_complete(real_cb));

    for _ in 0..3 {
        step(&mut world, &mut schedule, 0.5);
    }

    assert_eq!(scaled_fired.load(Ordering::SeqCst), 0);
    assert_eq!(real_fired.load(Ordering::SeqCst), 1);
}

#[test]
fn callback_commands_apply_at_tick_boundaries() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let chained = Arc::new(AtomicU32::new(0));
    let c = chained.clone();
    let commands = scheduler(&mut world).commands();

    let _first = scheduler(&mut world).once(1.0, move || {
        let c = c.clone();
        commands
            .create(TimerBuilder::new(1.0).on_complete(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .forget();
    });

    step(&mut world, &mut schedule, 1.0);
    {
        // Created during the pass: staged, not yet registered
        let s = world.resource::<TimerScheduler>();
        assert_eq!(s.len(), 0);
        assert_eq!(s.pending_len(), 1);
    }
    step(&mut world, &mut schedule, 1.0);
    assert_eq!(chained.load(Ordering::SeqCst), 1);
    assert!(world.resource::<TimerScheduler>().is_empty());
}

#[test]
fn callback_can_dispose_another_timer_mid_pass() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (victim_fired, victim_cb) = counter();
    let victim = scheduler(&mut world).persistent(1.0, victim_cb, true);
    let victim_id = victim.id();
    let commands = scheduler(&mut world).commands();
    let _killer = scheduler(&mut world).once(0.5, move || commands.dispose(victim_id));

    step(&mut world, &mut schedule, 0.5);
    assert!(!world.resource::<TimerScheduler>().contains(victim_id));
    step(&mut world, &mut schedule, 1.0);
    assert_eq!(victim_fired.load(Ordering::SeqCst), 0);
}

#[test]
fn commands_outlive_scheduler_silently() {
    let mut world = make_world();
    let commands = scheduler(&mut world).commands();
    world.remove_resource::<TimerScheduler>();
    commands.pause(commands.create(TimerBuilder::new(1.0)).forget());
}

#[test]
fn orphaned_repeating_timer_is_swept() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let (fired, cb) = counter();
    drop(scheduler(&mut world).persistent(1.0, cb, true));

    step(&mut world, &mut schedule, 1.0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler(&mut world).sweep_orphans(), 1);
    step(&mut world, &mut schedule, 1.0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(world.resource::<TimerScheduler>().is_empty());
}

#[test]
fn typing_effect_reveals_words_then_releases_timer() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let mut effect = TypingEffect::new("hello big world", TypingSpeed::VerySlow, RevealMode::Words);
    effect.begin(&mut scheduler(&mut world));
    let timer_id = effect.timer_id().unwrap();
    let entity = world.spawn(effect).id();

    // 0.85 s per word
    step(&mut world, &mut schedule, 0.9);
    assert_eq!(world.get::<TypingEffect>(entity).unwrap().visible_text(), "hello");
    step(&mut world, &mut schedule, 0.9);
    assert_eq!(world.get::<TypingEffect>(entity).unwrap().visible_text(), "hello big");
    step(&mut world, &mut schedule, 0.9);

    let effect = world.get::<TypingEffect>(entity).unwrap();
    assert_eq!(effect.visible_text(), "hello big world");
    assert!(!effect.is_typing());
    assert!(!world.resource::<TimerScheduler>().contains(timer_id));
}

#[test]
fn typing_effect_blazing_reveals_one_char_per_frame() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let mut effect = TypingEffect::new("abcd", TypingSpeed::Blazing, RevealMode::Characters);
    effect.begin(&mut scheduler(&mut world));
    let entity = world.spawn(effect).id();

    step(&mut world, &mut schedule, 0.016);
    step(&mut world, &mut schedule, 0.016);
    assert_eq!(world.get::<TypingEffect>(entity).unwrap().visible_chars(), 2);

    world.get_mut::<TypingEffect>(entity).unwrap().reveal_all();
    step(&mut world, &mut schedule, 0.016);
    let effect = world.get::<TypingEffect>(entity).unwrap();
    assert_eq!(effect.visible_text(), "abcd");
    assert!(!effect.is_typing());
}

#[test]
fn typing_effect_stops_when_its_timer_is_swept() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let mut effect = TypingEffect::new("abcdef", TypingSpeed::Glacial, RevealMode::Characters);
    effect.begin(&mut scheduler(&mut world));
    let entity = world.spawn(effect).id();

    step(&mut world, &mut schedule, 0.2);
    scheduler(&mut world).dispose_all_repeating();
    step(&mut world, &mut schedule, 0.2);

    let effect = world.get::<TypingEffect>(entity).unwrap();
    assert!(!effect.is_typing());
    assert_eq!(effect.visible_chars(), 1);
}

#[test]
fn typing_effect_clear_restarts_reveal() {
    let mut world = make_world();
    let mut schedule = make_schedule();
    let mut effect = TypingEffect::new("abcdefghij", TypingSpeed::Glacial, RevealMode::Characters);
    effect.begin(&mut scheduler(&mut world));
    let entity = world.spawn(effect).id();

    for _ in 0..5 {
        step(&mut world, &mut schedule, 0.2);
    }
    assert_eq!(world.get::<TypingEffect>(entity).unwrap().visible_chars(), 5);

    world.get_mut::<TypingEffect>(entity).unwrap().clear();
    step(&mut world, &mut schedule, 0.01);
    assert_eq!(world.get::<TypingEffect>(entity).unwrap().visible_chars(), 0);

    step(&mut world, &mut schedule, 0.2);
    let effect = world.get::<TypingEffect>(entity).unwrap();
    assert_eq!(effect.visible_text(), "a");
    assert!(effect.is_typing());
}
