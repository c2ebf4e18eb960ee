use std::{collections::BTreeMap, time::Duration, time::Instant};

use crystal_miner_system_session::{Clock, TickHandle};

/// Source of tick handles that fell due since the last poll.
pub(crate) trait TickSource {
    fn due_ticks(&mut self) -> Vec<TickHandle>;
}

#[derive(Clone, Copy, Debug)]
struct Schedule {
    interval: Duration,
    next_due: Duration,
}

/// Wall clock whose ticks are collected by polling between inputs.
#[derive(Debug)]
pub(crate) struct SystemClock {
    origin: Instant,
    next_handle: u64,
    schedules: BTreeMap<TickHandle, Schedule>,
}

impl SystemClock {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            next_handle: 0,
            schedules: BTreeMap::new(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule_tick(&mut self, interval: Duration) -> TickHandle {
        self.next_handle += 1;
        let handle = TickHandle::new(self.next_handle);
        let interval = interval.max(Duration::from_millis(1));
        let _ = self.schedules.insert(
            handle,
            Schedule {
                interval,
                next_due: self.now() + interval,
            },
        );
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        let _ = self.schedules.remove(&handle);
    }
}

impl TickSource for SystemClock {
    fn due_ticks(&mut self) -> Vec<TickHandle> {
        let now = self.now();
        let mut due: Vec<(Duration, TickHandle)> = Vec::new();
        for (handle, schedule) in &mut self.schedules {
            while schedule.next_due <= now {
                due.push((schedule.next_due, *handle));
                schedule.next_due += schedule.interval;
            }
        }
        due.sort_unstable();
        due.into_iter().map(|(_, handle)| handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_due_right_after_scheduling() {
        let mut clock = SystemClock::new();
        let _ = clock.schedule_tick(Duration::from_secs(60));

        assert!(clock.due_ticks().is_empty());
    }

    #[test]
    fn short_intervals_fall_due() {
        let mut clock = SystemClock::new();
        let handle = clock.schedule_tick(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));

        let due = clock.due_ticks();
        assert!(!due.is_empty());
        assert!(due.iter().all(|fired| *fired == handle));

        clock.cancel(handle);
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.due_ticks().is_empty());
    }
}
