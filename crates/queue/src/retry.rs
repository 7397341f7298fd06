use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Read cursor for entries delivered to this consumer but never acknowledged.
pub(crate) const PENDING: &str = "0";

/// Read cursor for entries never delivered to the group.
pub(crate) const NEW: &str = ">";

/// Outcome of a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Leave the entry pending; it is read again once the retry is due.
    Retry { attempt: u32 },
    /// Out of attempts: acknowledge the entry and drop it.
    GiveUp { attempts: u32 },
}

/// Per-consumer redelivery bookkeeping.
///
/// New entries are read by default. After a failure the pending list is
/// read once the retry delay has elapsed, then reading goes back to new
/// entries, so a failing entry never holds up the rest of the stream.
#[derive(Debug)]
pub(crate) struct RetryTracker {
    attempts: HashMap<String, u32>,
    max_attempts: u32,
    delay: Duration,
    due: Option<Instant>,
}

impl RetryTracker {
    /// The pending list is read first, to pick up entries left by a
    /// previous run.
    pub(crate) fn new(max_attempts: u32, delay: Duration, now: Instant) -> Self {
        Self {
            attempts: HashMap::new(),
            max_attempts: max_attempts.max(1),
            delay,
            due: Some(now),
        }
    }

    /// Cursor of the next read.
    pub(crate) fn next_cursor(&mut self, now: Instant) -> &'static str {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                PENDING
            }
            _ => NEW,
        }
    }

    /// How long a read of new entries may block without delaying a due
    /// retry. Never zero, which Redis reads as "block forever".
    pub(crate) fn block_budget(&self, now: Instant, max: Duration) -> Duration {
        let budget = self
            .due
            .map_or(max, |due| due.saturating_duration_since(now).min(max));
        budget.max(Duration::from_millis(1))
    }

    /// Read the pending list again on the next read.
    pub(crate) fn resume_pending(&mut self, now: Instant) {
        self.due = Some(now);
    }

    pub(crate) fn succeeded(&mut self, id: &str) {
        self.attempts.remove(id);
    }

    pub(crate) fn failed(&mut self, id: &str, now: Instant) -> Verdict {
        let attempt = self.attempts.entry(id.to_owned()).or_default();
        *attempt += 1;
        let attempt = *attempt;
        if attempt >= self.max_attempts {
            self.attempts.remove(id);
            return Verdict::GiveUp { attempts: attempt };
        }
        let due = now + self.delay;
        self.due = Some(self.due.map_or(due, |current| current.min(due)));
        Verdict::Retry { attempt }
    }
}
