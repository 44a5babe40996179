//! Timer registry and per-frame scheduler.
//!
//! [`TimerScheduler`] owns every live [`Timer`] and advances all of them once
//! per frame from [`update_timers`](crate::systems::timers::update_timers).
//! It is an ordinary ECS resource: the composition root inserts it into the
//! `World` and it is dropped with it.
//!
//! # Deferred structure changes
//!
//! New timers are staged and only join the tick list at the start of the next
//! tick. Disposed timers are removed at the end of the tick pass. Timer
//! callbacks cannot borrow the scheduler while it is ticking, so they talk to
//! it through [`TimerCommands`], a cloneable sender whose queue is applied at
//! tick boundaries:
//!
//! ```ignore
//! let commands = scheduler.commands();
//! let _chain = scheduler.create(TimerBuilder::new(1.0).on_complete(move || {
//!     commands.create(TimerBuilder::new(2.0)).forget();
//! }));
//! ```
//!
//! # Orphaned timers
//!
//! Dropping the only [`TimerHandle`] of a repeating timer leaves it running.
//! [`TimerScheduler::sweep_orphans`] disposes such timers and
//! [`TimerScheduler::dispose_all_repeating`] disposes every repeating timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::components::timer::{
    HandleState, TickOutcome, Timer, TimerBuilder, TimerHandle, TimerId, TimerInfo,
};

/// Operations queued through [`TimerCommands`].
#[derive(Debug)]
pub(crate) enum TimerCmd {
    Create {
        id: TimerId,
        builder: TimerBuilder,
        handle: HandleState,
    },
    Pause(TimerId),
    Unpause(TimerId),
    Restart { id: TimerId, pause_after: bool },
    SetDuration { id: TimerId, duration: f32 },
    Dispose(TimerId),
}

/// Shared id counter so commands can hand out ids before the scheduler sees them.
#[derive(Debug, Clone, Default)]
struct IdAllocator(Arc<AtomicU64>);

impl IdAllocator {
    fn next(&self) -> TimerId {
        TimerId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Sender side of the scheduler's command queue.
///
/// Safe to capture inside timer callbacks and to use from other systems.
/// Everything sent is applied at the next tick boundary. Sending after the
/// scheduler has been dropped is silently ignored.
#[derive(Debug, Clone)]
pub struct TimerCommands {
    tx: Sender<TimerCmd>,
    ids: IdAllocator,
}

impl TimerCommands {
    /// Queue a new timer. The handle is valid immediately.
    pub fn create(&self, builder: TimerBuilder) -> TimerHandle {
        let id = self.ids.next();
        let handle = HandleState::new();
        self.send(TimerCmd::Create {
            id,
            builder,
            handle: handle.clone(),
        });
        TimerHandle::new(id, handle)
    }

    pub fn pause(&self, id: TimerId) {
        self.send(TimerCmd::Pause(id));
    }

    pub fn unpause(&self, id: TimerId) {
        self.send(TimerCmd::Unpause(id));
    }

    pub fn restart(&self, id: TimerId, pause_after: bool) {
        self.send(TimerCmd::Restart { id, pause_after });
    }

    pub fn cancel(&self, id: TimerId) {
        self.restart(id, true);
    }

    pub fn set_duration(&self, id: TimerId, duration: f32) {
        self.send(TimerCmd::SetDuration { id, duration });
    }

    pub fn dispose(&self, id: TimerId) {
        self.send(TimerCmd::Dispose(id));
    }

    fn send(&self, cmd: TimerCmd) {
        // Ignore send error once the scheduler is gone
        let _ = self.tx.send(cmd);
    }
}

/// Registry of live timers, ticked once per frame.
#[derive(Resource)]
pub struct TimerScheduler {
    timers: Vec<Timer>,
    to_add: Vec<Timer>,
    to_destroy: FxHashSet<TimerId>,
    tx_cmd: Sender<TimerCmd>,
    rx_cmd: Receiver<TimerCmd>,
    ids: IdAllocator,
    clock: f32,
    unscaled_clock: f32,
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerScheduler {
    pub fn new() -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<TimerCmd>();
        TimerScheduler {
            timers: Vec::new(),
            to_add: Vec::new(),
            to_destroy: FxHashSet::default(),
            tx_cmd,
            rx_cmd,
            ids: IdAllocator::default(),
            clock: 0.0,
            unscaled_clock: 0.0,
        }
    }

    /// A sender for deferred operations, e.g. from inside timer callbacks.
    pub fn commands(&self) -> TimerCommands {
        TimerCommands {
            tx: self.tx_cmd.clone(),
            ids: self.ids.clone(),
        }
    }

    /// Stage a new timer; it is ticked from the next [`tick`](Self::tick) on.
    pub fn create(&mut self, builder: TimerBuilder) -> TimerHandle {
        let id = self.ids.next();
        let handle = HandleState::new();
        self.stage(id, builder, handle.clone());
        TimerHandle::new(id, handle)
    }

    /// One-shot timer that disposes itself after completing.
    pub fn once(
        &mut self,
        duration: f32,
        on_complete: impl FnMut() + Send + Sync + 'static,
    ) -> TimerHandle {
        self.create(TimerBuilder::new(duration).on_complete(on_complete))
    }

    /// Timer that stays registered after completing, optionally repeating.
    pub fn persistent(
        &mut self,
        duration: f32,
        on_complete: impl FnMut() + Send + Sync + 'static,
        repeating: bool,
    ) -> TimerHandle {
        let builder = TimerBuilder::new(duration).persistent().on_complete(on_complete);
        self.create(if repeating { builder.repeating() } else { builder })
    }

    fn stage(&mut self, id: TimerId, builder: TimerBuilder, handle: HandleState) {
        let now = self.now_for(builder.realtime);
        trace!("staging {id} ({}s)", builder.duration);
        self.to_add.push(Timer::new(id, builder, now, handle));
    }

    /// Advance every registered timer by one frame.
    ///
    /// Order: apply queued commands, register staged timers, tick each timer
    /// once, apply commands queued during the pass, drop disposed timers.
    pub fn tick(&mut self, delta: f32, unscaled_delta: f32) {
        self.apply_commands();
        self.clock += delta;
        self.unscaled_clock += unscaled_delta;

        if !self.to_add.is_empty() {
            debug!("registering {} timer(s)", self.to_add.len());
            self.timers.append(&mut self.to_add);
        }

        for timer in self.timers.iter_mut() {
            match timer.tick(delta, unscaled_delta) {
                TickOutcome::Expired => {
                    trace!("{} expired", timer.id());
                    self.to_destroy.insert(timer.id());
                }
                TickOutcome::Repeated | TickOutcome::Completed => {
                    trace!("{} completed ({})", timer.id(), timer.completions());
                }
                TickOutcome::Running | TickOutcome::Idle => {}
            }
        }

        self.apply_commands();
        self.flush_destroyed();
    }

    fn apply_commands(&mut self) {
        while let Ok(cmd) = self.rx_cmd.try_recv() {
            match cmd {
                TimerCmd::Create {
                    id,
                    builder,
                    handle,
                } => self.stage(id, builder, handle),
                TimerCmd::Pause(id) => {
                    self.pause(id);
                }
                TimerCmd::Unpause(id) => {
                    self.unpause(id);
                }
                TimerCmd::Restart { id, pause_after } => {
                    self.restart(id, pause_after);
                }
                TimerCmd::SetDuration { id, duration } => {
                    self.set_duration(id, duration);
                }
                TimerCmd::Dispose(id) => {
                    self.dispose_id(id);
                }
            }
        }
    }

    fn flush_destroyed(&mut self) {
        if self.to_destroy.is_empty() {
            return;
        }
        let to_destroy = &self.to_destroy;
        self.timers.retain(|t| !to_destroy.contains(&t.id()));
        debug!(
            "removed {} timer(s), {} live",
            self.to_destroy.len(),
            self.timers.len()
        );
        self.to_destroy.clear();
    }

    /// Live or staged timer that has not been disposed.
    fn find_mut(&mut self, id: TimerId) -> Option<&mut Timer> {
        self.timers
            .iter_mut()
            .chain(self.to_add.iter_mut())
            .find(|t| t.id() == id && !t.is_disposed())
    }

    /// Read access to a timer that is registered or staged.
    pub fn timer(&self, id: TimerId) -> Option<&Timer> {
        self.timers
            .iter()
            .chain(self.to_add.iter())
            .find(|t| t.id() == id && !t.is_disposed())
    }

    /// Whether `id` refers to a timer that has not been disposed.
    pub fn contains(&self, id: TimerId) -> bool {
        self.timer(id).is_some()
    }

    pub fn snapshot(&self, id: TimerId) -> Option<TimerInfo> {
        self.timer(id).map(TimerInfo::from)
    }

    /// Snapshots of all registered timers, in tick order.
    pub fn snapshots(&self) -> Vec<TimerInfo> {
        self.timers
            .iter()
            .filter(|t| !t.is_disposed())
            .map(TimerInfo::from)
            .collect()
    }

    /// Number of registered, not disposed timers (staged ones excluded).
    pub fn len(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_disposed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of timers waiting for the next tick to be registered.
    pub fn pending_len(&self) -> usize {
        self.to_add.len()
    }

    /// Accumulated scaled time.
    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Accumulated unscaled time.
    pub fn unscaled_clock(&self) -> f32 {
        self.unscaled_clock
    }

    fn now_for(&self, realtime: bool) -> f32 {
        if realtime {
            self.unscaled_clock
        } else {
            self.clock
        }
    }

    pub fn pause(&mut self, id: TimerId) -> bool {
        self.find_mut(id).map(Timer::pause).is_some()
    }

    pub fn unpause(&mut self, id: TimerId) -> bool {
        self.find_mut(id).map(Timer::unpause).is_some()
    }

    /// Reset a timer to its full duration, optionally leaving it paused.
    pub fn restart(&mut self, id: TimerId, pause_after: bool) -> bool {
        let Some(realtime) = self.timer(id).map(Timer::is_realtime) else {
            return false;
        };
        let now = self.now_for(realtime);
        self.find_mut(id)
            .map(|t| t.restart(now, pause_after))
            .is_some()
    }

    /// Start a timer over from its full duration: `restart(id, false)`.
    pub fn start(&mut self, id: TimerId) -> bool {
        self.restart(id, false)
    }

    /// Reset progress and halt: `restart(id, true)`.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.restart(id, true)
    }

    pub fn set_duration(&mut self, id: TimerId, duration: f32) -> bool {
        self.find_mut(id).map(|t| t.set_duration(duration)).is_some()
    }

    /// Dispose the timer owned by `handle`.
    pub fn dispose(&mut self, handle: TimerHandle) -> bool {
        self.dispose_id(handle.id())
    }

    /// Dispose a timer by id. No-op for unknown or already disposed ids.
    ///
    /// A staged timer is dropped right away and is never ticked. A registered
    /// one loses its callbacks now and leaves the list at the end of the next
    /// tick pass.
    pub fn dispose_id(&mut self, id: TimerId) -> bool {
        if let Some(pos) = self.to_add.iter().position(|t| t.id() == id) {
            self.to_add.remove(pos);
            trace!("dropped staged {id}");
            return true;
        }
        match self
            .timers
            .iter_mut()
            .find(|t| t.id() == id && !t.is_disposed())
        {
            Some(timer) => {
                timer.dispose();
                self.to_destroy.insert(id);
                trace!("disposed {id}");
                true
            }
            None => false,
        }
    }

    pub fn pause_all(&mut self) {
        for timer in self.timers.iter_mut() {
            timer.pause();
        }
    }

    pub fn unpause_all(&mut self) {
        for timer in self.timers.iter_mut() {
            timer.unpause();
        }
    }

    pub fn cancel_all(&mut self) {
        let (clock, unscaled_clock) = (self.clock, self.unscaled_clock);
        for timer in self.timers.iter_mut() {
            let now = if timer.is_realtime() {
                unscaled_clock
            } else {
                clock
            };
            timer.restart(now, true);
        }
    }

    /// Dispose every repeating timer, registered or staged. Returns the count.
    pub fn dispose_all_repeating(&mut self) -> usize {
        self.dispose_where(|t| t.is_repeating())
    }

    /// Dispose repeating and persistent timers whose handle was dropped.
    ///
    /// One-shot timers are left alone since they end by themselves.
    pub fn sweep_orphans(&mut self) -> usize {
        self.dispose_where(|t| (t.is_repeating() || t.is_persistent()) && t.is_orphaned())
    }

    fn dispose_where(&mut self, pred: impl Fn(&Timer) -> bool) -> usize {
        let staged = self.to_add.len();
        self.to_add.retain(|t| !pred(t));
        let mut count = staged - self.to_add.len();

        for timer in self.timers.iter_mut() {
            if !timer.is_disposed() && pred(&*timer) {
                timer.dispose();
                self.to_destroy.insert(timer.id());
                count += 1;
            }
        }
        if count > 0 {
            debug!("disposed {count} timer(s) in sweep");
        }
        count
    }
}
