use crate::clock::to_delta;
use crate::entity::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Directional, time-limited blocks. `(blocker, blocked)` keys an entry;
/// entries are purged lazily the first time a lookup finds them expired.
#[derive(Debug, Default)]
pub struct BlacklistStore {
    entries: HashMap<UserId, HashMap<UserId, DateTime<Utc>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlacklistEntry {
    pub blocker: UserId,
    pub blocked: UserId,
    pub expires_at: DateTime<Utc>,
}

impl BlacklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks `blocked` for `blocker` until `now + duration`, replacing any earlier entry.
    pub fn block(&mut self, blocker: UserId, blocked: UserId, duration: Duration, now: DateTime<Utc>) {
        let expires_at = now
            .checked_add_signed(to_delta(duration))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries
            .entry(blocker)
            .or_default()
            .insert(blocked, expires_at);
    }

    pub fn is_blocked(&mut self, blocker: UserId, blocked: UserId, now: DateTime<Utc>) -> bool {
        let Some(blocks) = self.entries.get_mut(&blocker) else {
            return false;
        };
        match blocks.get(&blocked) {
            Some(expires_at) if now < *expires_at => true,
            Some(_) => {
                blocks.remove(&blocked);
                if blocks.is_empty() {
                    self.entries.remove(&blocker);
                }
                debug!("Purged expired block {} -> {}", blocker, blocked);
                false
            }
            None => false,
        }
    }

    /// Either direction blocked.
    pub fn is_blocked_either(&mut self, a: UserId, b: UserId, now: DateTime<Utc>) -> bool {
        self.is_blocked(a, b, now) || self.is_blocked(b, a, now)
    }

    /// Removes every entry expired as of `now`, including pairs nobody looks up again.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        self.entries.retain(|_, blocks| {
            let before = blocks.len();
            blocks.retain(|_, expires_at| now < *expires_at);
            purged += before - blocks.len();
            !blocks.is_empty()
        });
        purged
    }

    /// Unexpired entries as of `now`, without purging anything.
    pub fn active_entries(&self, now: DateTime<Utc>) -> Vec<BlacklistEntry> {
        self.entries
            .iter()
            .flat_map(|(blocker, blocks)| {
                blocks.iter().filter(|(_, expires_at)| now < **expires_at).map(
                    |(blocked, expires_at)| BlacklistEntry {
                        blocker: *blocker,
                        blocked: *blocked,
                        expires_at: *expires_at,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_DAYS: Duration = Duration::from_secs(10 * 24 * 60 * 60);

    #[test]
    fn block_is_directional_and_expires() {
        let mut store = BlacklistStore::new();
        let (x, y) = (UserId(1), UserId(2));
        let t0 = Utc::now();

        store.block(x, y, TEN_DAYS, t0);
        assert!(store.is_blocked(x, y, t0));
        assert!(!store.is_blocked(y, x, t0));
        assert!(store.is_blocked_either(y, x, t0));

        let almost = t0 + to_delta(TEN_DAYS) - chrono::TimeDelta::seconds(1);
        assert!(store.is_blocked(x, y, almost));

        let expired = t0 + to_delta(TEN_DAYS);
        assert!(!store.is_blocked(x, y, expired));
        assert!(store.entries.is_empty());
    }

    #[test]
    fn reblocking_extends_expiry() {
        let mut store = BlacklistStore::new();
        let (x, y) = (UserId(1), UserId(2));
        let t0 = Utc::now();
        store.block(x, y, Duration::from_secs(60), t0);
        store.block(x, y, Duration::from_secs(600), t0);
        assert!(store.is_blocked(x, y, t0 + chrono::TimeDelta::seconds(120)));
    }

    #[test]
    fn active_entries_skips_expired_without_purging() {
        let mut store = BlacklistStore::new();
        let t0 = Utc::now();
        store.block(UserId(1), UserId(2), Duration::from_secs(60), t0);
        store.block(UserId(1), UserId(3), TEN_DAYS, t0);

        let later = t0 + chrono::TimeDelta::seconds(61);
        let active = store.active_entries(later);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].blocked, UserId(3));
        assert_eq!(store.entries[&UserId(1)].len(), 2);
    }

    #[test]
    fn purge_drops_expired_pairs_without_a_lookup() {
        let mut store = BlacklistStore::new();
        let t0 = Utc::now();
        store.block(UserId(1), UserId(2), Duration::from_secs(60), t0);
        store.block(UserId(1), UserId(3), TEN_DAYS, t0);
        store.block(UserId(4), UserId(5), Duration::from_secs(60), t0);

        assert_eq!(store.purge_expired(t0 + chrono::TimeDelta::seconds(60)), 2);
        assert_eq!(store.entries.len(), 1);
        assert!(store.is_blocked(UserId(1), UserId(3), t0));
    }
}
