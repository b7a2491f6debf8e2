use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Process the pending containers.
    Debounce,
    /// Startup rescan `n` (0-based) for late-rendered content.
    Retry(usize),
}

/// Cancellable one-shot timers keyed by kind.
///
/// Scheduling a kind that is already armed moves its deadline, which is
/// all a debounce needs.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    entries: Vec<(Instant, TimerKind)>,
}

impl TimerQueue {
    pub fn schedule(&mut self, kind: TimerKind, at: Instant) {
        self.cancel(kind);
        self.entries.push((at, kind));
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.entries.retain(|(_, k)| *k != kind);
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.entries.iter().any(|(_, k)| *k == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(at, _)| *at).min()
    }

    /// Removes and returns the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        let (index, _) = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (at, _))| *at <= now)
            .min_by_key(|(_, (at, _))| *at)?;
        Some(self.entries.remove(index).1)
    }
}
