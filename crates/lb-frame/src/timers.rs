use std::time::Duration;

/// Work scheduled by the frame host after an embedded document loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    ScrollReset { slot: usize, generation: u64 },
    WatcherExpiry { slot: usize, generation: u64 },
}

impl TimerTask {
    pub fn slot(&self) -> usize {
        match self {
            Self::ScrollReset { slot, .. } | Self::WatcherExpiry { slot, .. } => *slot,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Self::ScrollReset { generation, .. } | Self::WatcherExpiry { generation, .. } => {
                *generation
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTimer {
    id: u64,
    due: Duration,
    task: TimerTask,
}

/// Deterministic timer queue over a virtual clock.
///
/// Timers fire in due order; timers due at the same instant fire in the
/// order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    pending: Vec<ScheduledTimer>,
}

impl TimerQueue {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn schedule(&mut self, delay: Duration, task: TimerTask) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.pending.push(ScheduledTimer {
            id,
            due: self.now.saturating_add(delay),
            task,
        });
        id
    }

    /// Removes the earliest timer due at or before `until` and moves the
    /// clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<TimerTask> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= until)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;

        let timer = self.pending.remove(index);
        self.now = self.now.max(timer.due);
        Some(timer.task)
    }

    /// Moves the clock forward without firing anything. Never goes back.
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Drops every pending timer belonging to `slot` at an older generation.
    pub fn drop_stale(&mut self, slot: usize, current_generation: u64) -> usize {
        let before = self.pending.len();
        self.pending.retain(|timer| {
            timer.task.slot() != slot || timer.task.generation() >= current_generation
        });
        before - self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;
    use super::TimerTask;
    use std::time::Duration;

    fn reset(slot: usize, generation: u64) -> TimerTask {
        TimerTask::ScrollReset { slot, generation }
    }

    #[test]
    fn fires_in_due_order_then_schedule_order() {
        let mut queue = TimerQueue::default();
        queue.schedule(Duration::from_millis(500), reset(0, 1));
        queue.schedule(Duration::from_millis(120), reset(1, 1));
        queue.schedule(Duration::from_millis(120), reset(2, 1));

        let until = Duration::from_millis(1_000);
        let fired = std::iter::from_fn(|| queue.pop_due(until))
            .map(|task| task.slot())
            .collect::<Vec<_>>();
        assert_eq!(fired, vec![1, 2, 0]);
        assert_eq!(queue.now(), Duration::from_millis(500));
    }

    #[test]
    fn leaves_future_timers_pending() {
        let mut queue = TimerQueue::default();
        queue.schedule(Duration::from_millis(4_000), TimerTask::WatcherExpiry {
            slot: 0,
            generation: 1,
        });
        assert_eq!(queue.pop_due(Duration::from_millis(3_999)), None);
        queue.advance_to(Duration::from_millis(3_999));
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.now(), Duration::from_millis(3_999));
    }

    #[test]
    fn drops_timers_of_superseded_loads() {
        let mut queue = TimerQueue::default();
        queue.schedule(Duration::from_millis(120), reset(0, 1));
        queue.schedule(Duration::from_millis(120), reset(1, 1));
        queue.schedule(Duration::from_millis(120), reset(0, 2));

        assert_eq!(queue.drop_stale(0, 2), 1);
        assert_eq!(queue.pending_len(), 2);
    }
}
