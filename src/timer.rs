use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    id: TimerId,
    deadline: Instant,
}

/// One-shot timers polled from the UI loop. Nothing here sleeps: the loop asks
/// for due timers on every tick and dispatches them itself.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    scheduled: Vec<Scheduled>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Instant) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.scheduled.push(Scheduled { id, deadline });
        id
    }

    /// Returns true when the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.scheduled.len();
        self.scheduled.retain(|timer| timer.id != id);
        self.scheduled.len() != before
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.scheduled.iter().any(|timer| timer.id == id)
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.iter().map(|timer| timer.deadline).min()
    }

    /// Removes and returns every timer whose deadline has passed, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<Scheduled> = Vec::new();
        self.scheduled.retain(|timer| {
            if timer.deadline <= now {
                due.push(*timer);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|timer| (timer.deadline, timer.id));
        due.into_iter().map(|timer| timer.id).collect()
    }
}
