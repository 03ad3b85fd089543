use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle to a scheduled timer, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Virtual-clock timer queue driving every periodic and delayed task.
///
/// Timers fire in due-time order; timers due at the same instant fire in the
/// order they were scheduled. A cancelled timer never fires.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), T>,
    due: HashMap<TimerId, Duration>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            due: HashMap::new(),
        }
    }

    /// Current virtual time since the scheduler was created
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` after `delay`. Deadlines past the end of
    /// representable time saturate, so such a timer never comes due.
    pub fn schedule_in(&mut self, delay: Duration, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let at = self.now.saturating_add(delay);
        self.queue.insert((at, id), task);
        self.due.insert(id, at);
        id
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due.remove(&id) {
            Some(at) => self.queue.remove(&(at, id)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Pop the earliest timer due at or before `horizon`, moving the clock
    /// to its due time.
    pub fn pop_due(&mut self, horizon: Duration) -> Option<(TimerId, T)> {
        let (&(at, id), _) = self.queue.iter().next()?;
        if at > horizon {
            return None;
        }
        let task = self.queue.remove(&(at, id))?;
        self.due.remove(&id);
        if at > self.now {
            self.now = at;
        }
        Some((id, task))
    }

    /// Move the clock forward without firing anything. Never moves backwards.
    pub fn advance_to(&mut self, t: Duration) {
        if t > self.now {
            self.now = t;
        }
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Configurable ticker interface
pub trait Ticker {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn drain(s: &mut Scheduler<&'static str>, horizon: Duration) -> Vec<(Duration, &'static str)> {
        let mut fired = Vec::new();
        while let Some((_, task)) = s.pop_due(horizon) {
            fired.push((s.now(), task));
        }
        fired
    }

    #[test]
    fn fires_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule_in(ms(300), "c");
        s.schedule_in(ms(100), "a");
        s.schedule_in(ms(200), "b");
        assert_eq!(drain(&mut s, ms(1_000)), vec![(ms(100), "a"), (ms(200), "b"), (ms(300), "c")]);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn same_instant_keeps_schedule_order() {
        let mut s = Scheduler::new();
        s.schedule_in(ms(50), "first");
        s.schedule_in(ms(50), "second");
        let order: Vec<_> = drain(&mut s, ms(50)).into_iter().map(|(_, t)| t).collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[test]
    fn horizon_holds_back_later_timers() {
        let mut s = Scheduler::new();
        s.schedule_in(ms(100), "soon");
        s.schedule_in(ms(900), "later");
        assert_eq!(drain(&mut s, ms(500)).len(), 1);
        assert_eq!(s.next_due(), Some(ms(900)));
        assert_eq!(s.now(), ms(100));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut s = Scheduler::new();
        let id = s.schedule_in(ms(100), "dead");
        s.schedule_in(ms(200), "alive");
        assert!(s.is_pending(id));
        assert!(s.cancel(id));
        assert!(!s.is_pending(id));
        assert!(!s.cancel(id), "second cancel is a no-op");
        assert_eq!(drain(&mut s, ms(1_000)), vec![(ms(200), "alive")]);
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut s = Scheduler::new();
        let id = s.schedule_in(ms(10), "x");
        assert!(s.pop_due(ms(10)).is_some());
        assert!(!s.cancel(id));
    }

    #[test]
    fn delays_are_relative_to_now() {
        let mut s = Scheduler::new();
        s.advance_to(ms(1_000));
        s.schedule_in(ms(5), "x");
        assert_eq!(s.next_due(), Some(ms(1_005)));
        s.advance_to(ms(10));
        assert_eq!(s.now(), ms(1_000), "clock never moves backwards");
    }

    #[test]
    fn huge_delay_saturates_instead_of_overflowing() {
        let mut s = Scheduler::new();
        s.advance_to(ms(1_000));
        let id = s.schedule_in(Duration::MAX, "never");
        assert_eq!(s.next_due(), Some(Duration::MAX));
        assert!(s.pop_due(ms(u64::MAX)).is_none());
        assert!(s.cancel(id));
    }

    #[test]
    fn fixed_ticker_interval() {
        assert_eq!(FixedTicker::from_millis(1_000).interval(), Duration::from_secs(1));
    }
}
