use crate::blacklist::BlacklistStore;
use crate::chat::ChatSession;
use crate::entity::UserId;
use crate::error::MatchError;
use crate::profile::ProfileStore;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(ChatSession),
    Queued,
}

/// Waiting queue plus the active-pair table.
///
/// Every pair is stored as two directed entries sharing one [`ChatSession`];
/// they are only ever inserted and removed together. A user is in at most one
/// of the queue or the pair table.
#[derive(Debug, Default)]
pub struct MatchEngine {
    queue: VecDeque<UserId>,
    pairs: HashMap<UserId, ChatSession>,
}

impl MatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// First-fit search over the queue in insertion order. On success the
    /// candidate leaves the queue and the pair is registered in the same
    /// call; otherwise the requester joins the tail of the queue.
    pub fn enqueue_or_match(
        &mut self,
        user: UserId,
        profiles: &ProfileStore,
        blacklist: &mut BlacklistStore,
        now: DateTime<Utc>,
    ) -> Result<MatchOutcome, MatchError> {
        let profile = profiles.get(user).ok_or(MatchError::IncompleteProfile(user))?;
        if self.pairs.contains_key(&user) {
            return Err(MatchError::AlreadyPaired(user));
        }
        if self.is_queued(user) {
            return Err(MatchError::AlreadyQueued(user));
        }

        let position = self.queue.iter().position(|&candidate| {
            candidate != user
                && !blacklist.is_blocked_either(user, candidate, now)
                && profiles
                    .get(candidate)
                    .is_some_and(|theirs| theirs.is_compatible(&profile))
        });

        let Some(candidate) = position.and_then(|index| self.queue.remove(index)) else {
            self.queue.push_back(user);
            return Ok(MatchOutcome::Queued);
        };

        let session = ChatSession::new(user, candidate, now);
        self.pairs.insert(user, session.clone());
        self.pairs.insert(candidate, session.clone());
        Ok(MatchOutcome::Matched(session))
    }

    /// Idempotent.
    pub fn remove_from_queue(&mut self, user: UserId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|&queued| queued != user);
        before != self.queue.len()
    }

    /// Dissolves the user's pair, removing both directions. Returns the
    /// ended session, or `None` if the user was not chatting.
    pub fn end_pair(&mut self, user: UserId) -> Option<ChatSession> {
        let session = self.pairs.remove(&user)?;
        if let Some(partner) = session.partner_of(user) {
            if self.pairs.get(&partner).map(|s| s.id) == Some(session.id) {
                self.pairs.remove(&partner);
            }
        }
        Some(session)
    }

    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        self.pairs.get(&user).and_then(|s| s.partner_of(user))
    }

    /// True when `a` and `b` are still paired with each other under `session_id`,
    /// checked in both directions.
    pub fn is_current_pair(&self, a: UserId, b: UserId, session_id: Uuid) -> bool {
        let holds = |x: UserId, y: UserId| {
            self.pairs
                .get(&x)
                .is_some_and(|s| s.id == session_id && s.involves(x, y))
        };
        holds(a, b) && holds(b, a)
    }

    pub fn is_queued(&self, user: UserId) -> bool {
        self.queue.contains(&user)
    }

    pub fn queue(&self) -> impl Iterator<Item = UserId> + '_ {
        self.queue.iter().copied()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn active_pair_count(&self) -> usize {
        self.pairs.len() / 2
    }

    /// Each active session once.
    pub fn sessions(&self) -> impl Iterator<Item = &ChatSession> + '_ {
        self.pairs
            .iter()
            .filter(|(user, session)| **user == session.participant_a)
            .map(|(_, session)| session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AgeBracket, Gender};
    use std::time::Duration;

    struct Fixture {
        engine: MatchEngine,
        profiles: ProfileStore,
        blacklist: BlacklistStore,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                engine: MatchEngine::new(),
                profiles: ProfileStore::new(),
                blacklist: BlacklistStore::new(),
                now: Utc::now(),
            }
        }

        fn with_profile(&mut self, id: u64, gender: Gender, age: AgeBracket) -> UserId {
            let user = UserId(id);
            self.profiles.set_gender(user, gender);
            self.profiles.set_age(user, age);
            user
        }

        fn search(&mut self, user: UserId) -> Result<MatchOutcome, MatchError> {
            self.engine
                .enqueue_or_match(user, &self.profiles, &mut self.blacklist, self.now)
        }

        fn assert_disjoint(&self) {
            for queued in self.engine.queue() {
                assert!(self.engine.partner_of(queued).is_none(), "{} queued and paired", queued);
            }
        }
    }

    #[test]
    fn second_compatible_searcher_matches_the_first() {
        let mut fx = Fixture::new();
        let x = fx.with_profile(1, Gender::Male, AgeBracket::Adult);
        let y = fx.with_profile(2, Gender::Male, AgeBracket::Adult);

        assert_eq!(fx.search(x).unwrap(), MatchOutcome::Queued);
        let MatchOutcome::Matched(session) = fx.search(y).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(session.partner_of(y), Some(x));
        assert_eq!(fx.engine.partner_of(x), Some(y));
        assert_eq!(fx.engine.partner_of(y), Some(x));
        assert_eq!(fx.engine.queue_len(), 0);
        assert_eq!(fx.engine.active_pair_count(), 1);
        assert!(fx.engine.is_current_pair(x, y, session.id));
        fx.assert_disjoint();
    }

    #[test]
    fn incompatible_profiles_both_wait() {
        let mut fx = Fixture::new();
        let x = fx.with_profile(1, Gender::Male, AgeBracket::Adult);
        let y = fx.with_profile(2, Gender::Female, AgeBracket::Adult);
        let z = fx.with_profile(3, Gender::Male, AgeBracket::Under18);

        for user in [x, y, z] {
            assert_eq!(fx.search(user).unwrap(), MatchOutcome::Queued);
        }
        assert_eq!(fx.engine.queue().collect::<Vec<_>>(), vec![x, y, z]);
    }

    fn partner_in(outcome: MatchOutcome, user: UserId) -> Option<UserId> {
        match outcome {
            MatchOutcome::Matched(session) => session.partner_of(user),
            MatchOutcome::Queued => None,
        }
    }

    #[test]
    fn first_fit_follows_queue_order() {
        let mut fx = Fixture::new();
        let a = fx.with_profile(1, Gender::Female, AgeBracket::Adult);
        let b = fx.with_profile(2, Gender::Female, AgeBracket::Adult);
        let c = fx.with_profile(3, Gender::Female, AgeBracket::Adult);
        fx.blacklist.block(a, b, Duration::from_secs(60), fx.now);

        assert_eq!(fx.search(a).unwrap(), MatchOutcome::Queued);
        assert_eq!(fx.search(b).unwrap(), MatchOutcome::Queued);
        assert_eq!(partner_in(fx.search(c).unwrap(), c), Some(a));
        assert_eq!(fx.engine.queue().collect::<Vec<_>>(), vec![b]);
        fx.assert_disjoint();
    }

    #[test]
    fn blocked_candidates_are_skipped_in_both_directions() {
        let mut fx = Fixture::new();
        let x = fx.with_profile(1, Gender::Male, AgeBracket::Adult);
        let y = fx.with_profile(2, Gender::Male, AgeBracket::Adult);
        fx.blacklist.block(x, y, Duration::from_secs(10 * 24 * 60 * 60), fx.now);

        assert_eq!(fx.search(x).unwrap(), MatchOutcome::Queued);
        assert_eq!(fx.search(y).unwrap(), MatchOutcome::Queued);

        fx.engine.remove_from_queue(x);
        fx.engine.remove_from_queue(y);
        assert_eq!(fx.search(y).unwrap(), MatchOutcome::Queued);
        assert_eq!(fx.search(x).unwrap(), MatchOutcome::Queued);

        fx.engine.remove_from_queue(x);
        fx.now += chrono::TimeDelta::days(10);
        assert_eq!(partner_in(fx.search(x).unwrap(), x), Some(y));
    }

    #[test]
    fn skips_blocked_candidate_and_takes_the_next() {
        let mut fx = Fixture::new();
        let x = fx.with_profile(1, Gender::Male, AgeBracket::Adult);
        let y = fx.with_profile(2, Gender::Male, AgeBracket::Adult);
        let z = fx.with_profile(3, Gender::Male, AgeBracket::Adult);
        fx.blacklist.block(x, y, Duration::from_secs(60), fx.now);
        fx.blacklist.block(z, x, Duration::from_secs(60), fx.now);

        fx.search(x).unwrap();
        fx.search(y).unwrap();
        assert_eq!(partner_in(fx.search(z).unwrap(), z), Some(y));
        assert_eq!(fx.engine.queue().collect::<Vec<_>>(), vec![x]);
    }

    #[test]
    fn preconditions_are_reported() {
        let mut fx = Fixture::new();
        let x = fx.with_profile(1, Gender::Male, AgeBracket::Adult);
        let y = fx.with_profile(2, Gender::Male, AgeBracket::Adult);
        let incomplete = UserId(9);
        fx.profiles.set_gender(incomplete, Gender::Male);

        assert_eq!(fx.search(incomplete), Err(MatchError::IncompleteProfile(incomplete)));
        fx.search(x).unwrap();
        assert_eq!(fx.search(x), Err(MatchError::AlreadyQueued(x)));
        fx.search(y).unwrap();
        assert_eq!(fx.search(y), Err(MatchError::AlreadyPaired(y)));
    }

    #[test]
    fn end_pair_is_symmetric_and_idempotent() {
        let mut fx = Fixture::new();
        let x = fx.with_profile(1, Gender::Female, AgeBracket::Under18);
        let y = fx.with_profile(2, Gender::Female, AgeBracket::Under18);
        fx.search(x).unwrap();
        fx.search(y).unwrap();

        let ended = fx.engine.end_pair(y).unwrap();
        assert_eq!(ended.partner_of(y), Some(x));
        assert_eq!(fx.engine.partner_of(x), None);
        assert_eq!(fx.engine.partner_of(y), None);
        assert!(fx.engine.end_pair(y).is_none());
        assert!(fx.engine.end_pair(x).is_none());
        assert_eq!(fx.engine.active_pair_count(), 0);
    }

    #[test]
    fn remove_from_queue_is_idempotent() {
        let mut fx = Fixture::new();
        let x = fx.with_profile(1, Gender::Male, AgeBracket::Adult);
        fx.search(x).unwrap();
        assert!(fx.engine.remove_from_queue(x));
        assert!(!fx.engine.remove_from_queue(x));
        assert_eq!(fx.engine.queue_len(), 0);
    }

    #[test]
    fn many_searchers_never_overlap_queue_and_pairs() {
        let mut fx = Fixture::new();
        let genders = [Gender::Male, Gender::Female];
        let ages = [AgeBracket::Adult, AgeBracket::Under18];
        let users: Vec<_> = (0..40u64)
            .map(|i| fx.with_profile(i, genders[(i % 2) as usize], ages[(i / 2 % 2) as usize]))
            .collect();

        for (i, user) in users.iter().enumerate() {
            fx.search(*user).unwrap();
            if i % 7 == 0 {
                fx.engine.end_pair(*user);
            }
            fx.assert_disjoint();
        }
        for session in fx.engine.sessions() {
            let (a, b) = (session.participant_a, session.participant_b);
            assert_eq!(fx.engine.partner_of(a), Some(b));
            assert_eq!(fx.engine.partner_of(b), Some(a));
        }
    }
}
