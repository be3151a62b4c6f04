//! Cancellable one-shot and periodic timers driven by an externally supplied clock.
//!
//! Engines never sleep; they hand the current monotonic time to [`TimerQueue::pop_due`]
//! and handle whatever fired, in deadline order. Every timer remembers the session
//! generation it was armed in so callbacks from a previous session can be dropped.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<K> {
    id: TimerId,
    due: Duration,
    period: Option<Duration>,
    generation: u64,
    kind: K,
}

/// A timer that has come due
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<K> {
    pub id: TimerId,
    pub at: Duration,
    pub generation: u64,
    pub kind: K,
}

#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    timers: Vec<Timer<K>>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<K: Clone> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once(&mut self, now: Duration, delay: Duration, generation: u64, kind: K) -> TimerId {
        self.push(now + delay, None, generation, kind)
    }

    /// First fires one `period` after `now`. A zero period is bumped to 1ms.
    pub fn every(&mut self, now: Duration, period: Duration, generation: u64, kind: K) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.push(now + period, Some(period), generation, kind)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Removes and returns the earliest timer due at or before `now`.
    /// Periodic timers are re-armed one period after their own deadline.
    /// Ties go to the timer armed first.
    pub fn pop_due(&mut self, now: Duration) -> Option<Fired<K>> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(idx, _)| idx)?;

        let fired = match self.timers[idx].period {
            Some(period) => {
                let timer = &mut self.timers[idx];
                let at = timer.due;
                timer.due += period;
                Fired {
                    id: timer.id,
                    at,
                    generation: timer.generation,
                    kind: timer.kind.clone(),
                }
            }
            None => {
                let timer = self.timers.swap_remove(idx);
                Fired {
                    id: timer.id,
                    at: timer.due,
                    generation: timer.generation,
                    kind: timer.kind,
                }
            }
        };

        Some(fired)
    }

    fn push(
        &mut self,
        due: Duration,
        period: Option<Duration>,
        generation: u64,
        kind: K,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due,
            period,
            generation,
            kind,
        });
        id
    }
}
