use crate::clock::to_delta;
use crate::entity::UserId;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Sliding-window rate limiter keyed by user.
#[derive(Debug)]
pub struct SpamGuard {
    limit: usize,
    window: TimeDelta,
    windows: HashMap<UserId, VecDeque<DateTime<Utc>>>,
}

impl SpamGuard {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window: to_delta(window),
            windows: HashMap::new(),
        }
    }

    /// Returns `true` when the user is over the limit. Rejected messages are
    /// not recorded, so a throttled user recovers once the window slides.
    pub fn record_and_check(&mut self, user: UserId, now: DateTime<Utc>) -> bool {
        let window = self.window;
        let stamps = self.windows.entry(user).or_default();
        prune(stamps, now, window);

        if stamps.len() >= self.limit {
            return true;
        }
        stamps.push_back(now);
        false
    }

    /// Drops users whose window has fully slid past. Returns how many were dropped.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        let window = self.window;
        self.windows.retain(|_, stamps| {
            prune(stamps, now, window);
            !stamps.is_empty()
        });
        before - self.windows.len()
    }
}

fn prune(stamps: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: TimeDelta) {
    while let Some(oldest) = stamps.front() {
        if now - *oldest >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}
