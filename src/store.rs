use crate::{
    blacklist::{BlacklistEntry, BlacklistStore},
    config::SessionConfig,
    entity::{Profile, UserId},
    matchmaker::MatchEngine,
    profile::ProfileStore,
    spam::SpamGuard,
    stats::{StatsStore, TopUser},
    timer::SessionTimer,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const TOP_USERS_LIMIT: usize = 10;

/// Where a user is in the conversation lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UserState {
    #[default]
    Idle,
    FillingProfile,
    Searching,
    Chatting,
    /// Waiting for a verdict on the partner that just left.
    Rating { partner: UserId },
}

/// All mutable matchmaking state, owned in one place and mutated under one lock.
/// Nothing here survives a restart.
#[derive(Debug)]
pub struct SessionStore {
    states: HashMap<UserId, UserState>,
    pub profiles: ProfileStore,
    pub blacklist: BlacklistStore,
    pub spam: SpamGuard,
    pub stats: StatsStore,
    pub engine: MatchEngine,
    pub timers: SessionTimer,
}

/// Read-only projection for the admin endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSnapshot {
    pub total_users: usize,
    pub active_pairs: usize,
    pub queue_length: usize,
    pub total_blocks: usize,
    pub top_users: Vec<TopUser>,
    pub active_chats: Vec<ActiveChat>,
    pub waiting: Vec<WaitingUser>,
    pub blocks: Vec<BlacklistEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveChat {
    pub user_a: UserId,
    pub name_a: String,
    pub user_b: UserId,
    pub name_b: String,
    pub started_at: DateTime<Utc>,
}

/// A queued user, in queue order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitingUser {
    pub user: UserId,
    pub name: String,
    pub profile: Option<Profile>,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            states: HashMap::new(),
            profiles: ProfileStore::new(),
            blacklist: BlacklistStore::new(),
            spam: SpamGuard::new(config.spam_limit, config.spam_window),
            stats: StatsStore::new(),
            engine: MatchEngine::new(),
            timers: SessionTimer::new(),
        }
    }

    /// Unknown users are `Idle`.
    pub fn state(&self, user: UserId) -> UserState {
        self.states.get(&user).copied().unwrap_or_default()
    }

    pub fn set_state(&mut self, user: UserId, state: UserState) {
        self.states.insert(user, state);
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> AdminSnapshot {
        let mut active_chats: Vec<ActiveChat> = self
            .engine
            .sessions()
            .map(|session| ActiveChat {
                user_a: session.participant_a,
                name_a: self.stats.display_name(session.participant_a),
                user_b: session.participant_b,
                name_b: self.stats.display_name(session.participant_b),
                started_at: session.started_at,
            })
            .collect();
        active_chats.sort_by_key(|chat| (chat.started_at, chat.user_a));

        let waiting = self
            .engine
            .queue()
            .map(|user| WaitingUser {
                user,
                name: self.stats.display_name(user),
                profile: self.profiles.get(user),
            })
            .collect();

        let mut blocks = self.blacklist.active_entries(now);
        blocks.sort_by_key(|entry| (entry.expires_at, entry.blocker, entry.blocked));

        AdminSnapshot {
            total_users: self.states.len(),
            active_pairs: self.engine.active_pair_count(),
            queue_length: self.engine.queue_len(),
            total_blocks: blocks.len(),
            top_users: self.stats.top_users(TOP_USERS_LIMIT),
            active_chats,
            waiting,
            blocks,
        }
    }
}
