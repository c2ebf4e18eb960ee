//! Clock collaborator and a deterministic clock for tests and replays.

use std::{collections::BTreeMap, time::Duration};

/// Handle identifying one scheduled, cancellable tick stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickHandle(u64);

impl TickHandle {
    /// Creates a handle from its numeric representation.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Time source and tick scheduler used by the session controller.
///
/// Scheduling returns a handle; the driver later delivers each due tick by
/// passing that handle back to the controller. A cancelled handle must never
/// be delivered again.
pub trait Clock {
    /// Monotonic time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Starts a repeating tick stream firing every `interval`.
    fn schedule_tick(&mut self, interval: Duration) -> TickHandle;

    /// Stops a tick stream; unknown handles are ignored.
    fn cancel(&mut self, handle: TickHandle);
}

#[derive(Clone, Copy, Debug)]
struct Schedule {
    interval: Duration,
    next_due: Duration,
}

/// Clock whose time only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Duration,
    next_handle: u64,
    schedules: BTreeMap<TickHandle, Schedule>,
}

impl ManualClock {
    /// Creates a clock at time zero with nothing scheduled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward and returns the ticks that fell due, in firing order.
    pub fn advance(&mut self, dt: Duration) -> Vec<TickHandle> {
        let target = self.now.saturating_add(dt);
        let mut fired = Vec::new();
        loop {
            let due = self
                .schedules
                .iter()
                .filter(|(_, schedule)| schedule.next_due <= target)
                .min_by_key(|(handle, schedule)| (schedule.next_due, **handle))
                .map(|(handle, _)| *handle);
            let Some(handle) = due else {
                break;
            };
            if let Some(schedule) = self.schedules.get_mut(&handle) {
                self.now = schedule.next_due;
                schedule.next_due = schedule.next_due.saturating_add(schedule.interval);
            }
            fired.push(handle);
        }
        self.now = target;
        fired
    }

    /// Handles whose tick streams are still running.
    #[must_use]
    pub fn active(&self) -> Vec<TickHandle> {
        self.schedules.keys().copied().collect()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule_tick(&mut self, interval: Duration) -> TickHandle {
        self.next_handle += 1;
        let handle = TickHandle::new(self.next_handle);
        let interval = interval.max(Duration::from_millis(1));
        let _ = self.schedules.insert(
            handle,
            Schedule {
                interval,
                next_due: self.now.saturating_add(interval),
            },
        );
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        let _ = self.schedules.remove(&handle);
    }
}
