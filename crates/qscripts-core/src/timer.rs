use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Unique identifier for a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// A recurring timer with metadata
#[derive(Debug, Clone)]
struct Timer {
    name: String,
    interval: Duration,
    next_fire: Instant,
}

/// Poll-driven recurring timers for the file monitor
///
/// Nothing fires on its own: the host calls [`tick`](Self::tick) and sleeps
/// until [`next_deadline`](Self::next_deadline). A timer's handler decides the
/// next interval through [`reschedule`](Self::reschedule).
#[derive(Debug)]
pub struct TimerManager {
    timers: HashMap<TimerId, Timer>,
    next_id: u64,
}

impl TimerManager {
    /// Create a new timer manager
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedule a recurring timer that fires repeatedly at an interval
    pub fn schedule_recurring(&mut self, interval: Duration, name: impl Into<String>) -> TimerId {
        self.schedule_recurring_at(Instant::now(), interval, name)
    }

    pub fn schedule_recurring_at(
        &mut self,
        now: Instant,
        interval: Duration,
        name: impl Into<String>,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let timer = Timer {
            name: name.into(),
            interval,
            next_fire: now + interval,
        };
        self.timers.insert(id, timer);
        id
    }

    /// Change a timer's interval, counting from `now`
    ///
    /// Returns false for unknown timers.
    pub fn reschedule(&mut self, id: TimerId, now: Instant, interval: Duration) -> bool {
        match self.timers.get_mut(&id) {
            Some(timer) => {
                timer.interval = interval;
                timer.next_fire = now + interval;
                true
            }
            None => false,
        }
    }

    /// Cancel a timer
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Process timers and return the fired timer IDs with their names
    pub fn tick(&mut self, now: Instant) -> Vec<(TimerId, String)> {
        let mut fired = Vec::new();

        for (id, timer) in self.timers.iter_mut() {
            if now >= timer.next_fire {
                fired.push((*id, timer.name.clone()));
                timer.next_fire = now + timer.interval;
            }
        }

        fired
    }

    /// Earliest instant at which some timer is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.next_fire).min()
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}
