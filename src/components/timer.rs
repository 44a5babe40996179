//! Countdown / repeat timer owned by the [`TimerScheduler`].
//!
//! A [`Timer`] counts `remaining` down from `duration` each time the
//! scheduler ticks it. When `remaining` reaches zero the timer completes:
//!
//! - **repeating** timers roll the leftover time into the next cycle and keep running
//! - **persistent** timers stay registered but go idle until restarted or disposed
//! - anything else disposes itself and is removed by the scheduler
//!
//! Timers are never constructed directly. Describe one with a [`TimerBuilder`]
//! and hand it to [`TimerScheduler::create`]; the scheduler returns a
//! [`TimerHandle`] and keeps the timer itself.
//!
//! # Threshold callbacks
//!
//! Besides `on_complete` and `on_update`, a timer can fire callbacks every
//! time `remaining` drops by a fixed band: 0.1 s (`on_millisecond`), 1 s
//! (`on_second`) and 60 s (`on_minute`). The bands are counted from
//! `duration`, so the callbacks are independent of the frame rate. At most one
//! firing per band happens in a single tick.
//!
//! # Related
//!
//! - [`crate::resources::timerscheduler::TimerScheduler`] – owns and ticks timers
//! - [`crate::systems::timers::update_timers`] – the system driving the scheduler
//!
//! [`TimerScheduler`]: crate::resources::timerscheduler::TimerScheduler
//! [`TimerScheduler::create`]: crate::resources::timerscheduler::TimerScheduler::create

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Band sizes, in seconds, for the threshold callbacks.
pub const MILLISECOND_BAND: f32 = 0.1;
pub const SECOND_BAND: f32 = 1.0;
pub const MINUTE_BAND: f32 = 60.0;

/// Callback without arguments (`on_complete` and the threshold callbacks).
pub type TimerCallback = Box<dyn FnMut() + Send + Sync>;
/// Callback receiving the time remaining after each tick.
pub type UpdateCallback = Box<dyn FnMut(f32) + Send + Sync>;

/// Stable identifier of a timer inside a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    /// Raw numeric value, unique per scheduler.
    pub fn to_bits(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

const HANDLE_HELD: u8 = 0;
const HANDLE_DROPPED: u8 = 1;
const HANDLE_FORGOTTEN: u8 = 2;

/// Shared flag between a [`TimerHandle`] and the timer it refers to.
#[derive(Debug, Clone)]
pub(crate) struct HandleState(Arc<AtomicU8>);

impl HandleState {
    pub(crate) fn new() -> Self {
        HandleState(Arc::new(AtomicU8::new(HANDLE_HELD)))
    }

    /// The handle went away without being forgotten.
    pub(crate) fn is_orphaned(&self) -> bool {
        self.0.load(Ordering::Acquire) == HANDLE_DROPPED
    }
}

/// Owning reference to a timer living in a scheduler.
///
/// The handle is not `Clone`: there is exactly one owner responsible for
/// disposing long-lived timers. Dropping the handle leaves the timer running
/// but marks it orphaned, so [`TimerScheduler::sweep_orphans`] can reclaim it
/// if it is repeating or persistent. Use [`TimerHandle::forget`] to detach on
/// purpose.
///
/// [`TimerScheduler::sweep_orphans`]: crate::resources::timerscheduler::TimerScheduler::sweep_orphans
#[must_use = "dropping a TimerHandle orphans the timer; use `forget` to detach it on purpose"]
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    state: HandleState,
}

impl TimerHandle {
    pub(crate) fn new(id: TimerId, state: HandleState) -> Self {
        TimerHandle { id, state }
    }

    /// Identifier used to address the timer in the scheduler.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Release the handle while keeping the timer alive.
    ///
    /// A forgotten timer is never reclaimed by `sweep_orphans`; it runs until
    /// it disposes itself or someone disposes it by id.
    pub fn forget(self) -> TimerId {
        self.state.0.store(HANDLE_FORGOTTEN, Ordering::Release);
        self.id
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        let _ = self.state.0.compare_exchange(
            HANDLE_HELD,
            HANDLE_DROPPED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Fixed set of optional callbacks attached to a timer at creation.
#[derive(Default)]
pub struct TimerCallbacks {
    pub on_complete: Option<TimerCallback>,
    pub on_update: Option<UpdateCallback>,
    pub on_millisecond: Option<TimerCallback>,
    pub on_second: Option<TimerCallback>,
    pub on_minute: Option<TimerCallback>,
}

impl fmt::Debug for TimerCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerCallbacks")
            .field("on_complete", &self.on_complete.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_millisecond", &self.on_millisecond.is_some())
            .field("on_second", &self.on_second.is_some())
            .field("on_minute", &self.on_minute.is_some())
            .finish()
    }
}

/// Description of a timer to be created by the scheduler.
///
/// ```ignore
/// let handle = scheduler.create(
///     TimerBuilder::new(3.0)
///         .on_second(|| info!("beep"))
///         .on_complete(|| info!("go!")),
/// );
/// ```
#[derive(Debug)]
pub struct TimerBuilder {
    pub(crate) duration: f32,
    pub(crate) realtime: bool,
    pub(crate) repeating: bool,
    pub(crate) persistent: bool,
    pub(crate) start_paused: bool,
    pub(crate) callbacks: TimerCallbacks,
}

impl TimerBuilder {
    /// One-shot timer of `duration` seconds driven by scaled time.
    pub fn new(duration: f32) -> Self {
        TimerBuilder {
            duration,
            realtime: false,
            repeating: false,
            persistent: false,
            start_paused: false,
            callbacks: TimerCallbacks::default(),
        }
    }

    /// Count down with the unscaled delta (ignores `time_scale`).
    #[inline]
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    /// Roll over and keep running after each completion.
    #[inline]
    pub fn repeating(mut self) -> Self {
        self.repeating = true;
        self
    }

    /// Stay registered after completing instead of disposing.
    #[inline]
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Register the timer already paused.
    #[inline]
    pub fn paused(mut self) -> Self {
        self.start_paused = true;
        self
    }

    pub fn on_complete(mut self, f: impl FnMut() + Send + Sync + 'static) -> Self {
        self.callbacks.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl FnMut(f32) + Send + Sync + 'static) -> Self {
        self.callbacks.on_update = Some(Box::new(f));
        self
    }

    pub fn on_millisecond(mut self, f: impl FnMut() + Send + Sync + 'static) -> Self {
        self.callbacks.on_millisecond = Some(Box::new(f));
        self
    }

    pub fn on_second(mut self, f: impl FnMut() + Send + Sync + 'static) -> Self {
        self.callbacks.on_second = Some(Box::new(f));
        self
    }

    pub fn on_minute(mut self, f: impl FnMut() + Send + Sync + 'static) -> Self {
        self.callbacks.on_minute = Some(Box::new(f));
        self
    }
}

/// What happened to a timer during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Paused, complete or disposed: nothing changed.
    Idle,
    /// Counted down without completing.
    Running,
    /// Completed and rolled over into a new cycle.
    Repeated,
    /// Completed and went idle (persistent timers).
    Completed,
    /// Completed and disposed itself; the scheduler must remove it.
    Expired,
}

/// A single countdown timer.
pub struct Timer {
    id: TimerId,
    duration: f32,
    remaining: f32,
    repeating: bool,
    persistent: bool,
    realtime: bool,
    paused: bool,
    complete: bool,
    disposed: bool,
    start_time: f32,
    complete_time: f32,
    completions: u32,
    prev_millisecond_fired: f32,
    prev_second_fired: f32,
    prev_minute_fired: f32,
    callbacks: TimerCallbacks,
    handle: HandleState,
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("duration", &self.duration)
            .field("remaining", &self.remaining)
            .field("repeating", &self.repeating)
            .field("persistent", &self.persistent)
            .field("realtime", &self.realtime)
            .field("paused", &self.paused)
            .field("complete", &self.complete)
            .field("disposed", &self.disposed)
            .field("completions", &self.completions)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl Timer {
    /// Build a started timer. `now` is the scheduler clock of the timer's
    /// own time source (scaled or unscaled).
    pub(crate) fn new(id: TimerId, builder: TimerBuilder, now: f32, handle: HandleState) -> Self {
        let mut timer = Timer {
            id,
            duration: builder.duration,
            remaining: builder.duration,
            repeating: builder.repeating,
            persistent: builder.persistent,
            realtime: builder.realtime,
            paused: false,
            complete: false,
            disposed: false,
            start_time: now,
            complete_time: now + builder.duration,
            completions: 0,
            prev_millisecond_fired: builder.duration,
            prev_second_fired: builder.duration,
            prev_minute_fired: builder.duration,
            callbacks: builder.callbacks,
            handle,
        };
        timer.restart(now, builder.start_paused);
        timer
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
    pub fn duration(&self) -> f32 {
        self.duration
    }
    pub fn remaining(&self) -> f32 {
        self.remaining
    }
    pub fn elapsed(&self) -> f32 {
        self.duration - self.remaining
    }
    /// `remaining / duration`, or 0 for non-positive durations.
    pub fn fraction_remaining(&self) -> f32 {
        if self.duration > 0.0 {
            self.remaining / self.duration
        } else {
            0.0
        }
    }
    /// `elapsed / duration`, or 1 for non-positive durations.
    pub fn fraction_elapsed(&self) -> f32 {
        if self.duration > 0.0 {
            self.elapsed() / self.duration
        } else {
            1.0
        }
    }
    pub fn is_repeating(&self) -> bool {
        self.repeating
    }
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
    pub fn is_realtime(&self) -> bool {
        self.realtime
    }
    pub fn is_paused(&self) -> bool {
        self.paused
    }
    pub fn is_complete(&self) -> bool {
        self.complete
    }
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
    /// Clock value at which the current cycle started.
    pub fn start_time(&self) -> f32 {
        self.start_time
    }
    /// Clock value at which the current cycle is expected to complete.
    pub fn complete_time(&self) -> f32 {
        self.complete_time
    }
    /// How many times `on_complete` has fired.
    pub fn completions(&self) -> u32 {
        self.completions
    }

    pub(crate) fn is_orphaned(&self) -> bool {
        self.handle.is_orphaned()
    }

    /// Reset progress to a full `duration` and optionally pause.
    pub(crate) fn restart(&mut self, now: f32, pause_after_restart: bool) {
        if self.disposed {
            return;
        }
        self.remaining = self.duration;
        self.complete = false;
        self.paused = pause_after_restart;
        self.start_time = now;
        self.complete_time = now + self.duration;
        self.prev_millisecond_fired = self.duration;
        self.prev_second_fired = self.duration;
        self.prev_minute_fired = self.duration;
    }

    pub(crate) fn pause(&mut self) {
        self.paused = true;
    }

    pub(crate) fn unpause(&mut self) {
        self.paused = false;
    }

    /// Change the target interval. `remaining` is untouched; the new value is
    /// used from the next rollover or restart on.
    pub(crate) fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
    }

    /// Clear every callback and mark the timer dead.
    pub(crate) fn dispose(&mut self) {
        self.callbacks = TimerCallbacks::default();
        self.disposed = true;
    }

    /// Advance the timer by one frame.
    pub(crate) fn tick(&mut self, delta: f32, unscaled_delta: f32) -> TickOutcome {
        if self.disposed || self.complete || self.paused {
            return TickOutcome::Idle;
        }

        self.remaining -= if self.realtime { unscaled_delta } else { delta };
        if let Some(on_update) = self.callbacks.on_update.as_mut() {
            on_update(self.remaining);
        }

        let remaining = self.remaining;
        fire_band(
            &mut self.callbacks.on_millisecond,
            &mut self.prev_millisecond_fired,
            remaining,
            MILLISECOND_BAND,
        );
        fire_band(
            &mut self.callbacks.on_second,
            &mut self.prev_second_fired,
            remaining,
            SECOND_BAND,
        );
        fire_band(
            &mut self.callbacks.on_minute,
            &mut self.prev_minute_fired,
            remaining,
            MINUTE_BAND,
        );

        if self.remaining > 0.0 {
            return TickOutcome::Running;
        }

        self.complete = true;
        self.completions += 1;
        if let Some(on_complete) = self.callbacks.on_complete.as_mut() {
            on_complete();
        }

        if self.repeating {
            self.remaining += self.duration;
            self.complete_time += self.duration;
            self.prev_millisecond_fired += self.duration;
            self.prev_second_fired += self.duration;
            self.prev_minute_fired += self.duration;
            self.complete = false;
            TickOutcome::Repeated
        } else if self.persistent {
            TickOutcome::Completed
        } else {
            self.dispose();
            TickOutcome::Expired
        }
    }
}

/// Fire `callback` once if `remaining` dropped a full `band` below `baseline`.
///
/// The baseline then moves to the lowest band boundary still at or above
/// `remaining`, so a long frame crossing several bands fires once and leaves
/// no backlog for later frames.
fn fire_band(callback: &mut Option<TimerCallback>, baseline: &mut f32, remaining: f32, band: f32) {
    let Some(cb) = callback.as_mut() else {
        return;
    };
    let behind = *baseline - remaining;
    if behind >= band {
        *baseline -= band * (behind / band).floor();
        cb();
    }
}

/// Serializable point-in-time view of a timer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerInfo {
    pub id: TimerId,
    pub duration: f32,
    pub remaining: f32,
    pub elapsed: f32,
    pub repeating: bool,
    pub persistent: bool,
    pub realtime: bool,
    pub paused: bool,
    pub complete: bool,
    pub completions: u32,
}

impl From<&Timer> for TimerInfo {
    fn from(timer: &Timer) -> Self {
        TimerInfo {
            id: timer.id,
            duration: timer.duration,
            remaining: timer.remaining,
            elapsed: timer.elapsed(),
            repeating: timer.repeating,
            persistent: timer.persistent,
            realtime: timer.realtime,
            paused: timer.paused,
            complete: timer.complete,
            completions: timer.completions,
        }
    }
}
