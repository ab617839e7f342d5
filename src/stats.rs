use crate::entity::UserId;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

const ADJECTIVES: &[&str] = &["Secret", "Hidden", "Unknown", "Anonymous", "Mysterious"];
const NOUNS: &[&str] = &["Companion", "Traveler", "Wanderer", "Guest", "Stranger"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub chats_count: u64,
    pub messages_sent: u64,
    pub rating: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopUser {
    pub name: String,
    pub chats_count: u64,
    pub messages_sent: u64,
    pub rating: i64,
}

/// Per-user counters and stable anonymous display names.
#[derive(Debug, Default)]
pub struct StatsStore {
    stats: HashMap<UserId, UserStats>,
    names: HashMap<UserId, String>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> UserStats {
        self.stats.get(&user).copied().unwrap_or_default()
    }

    pub fn record_chat(&mut self, user: UserId) {
        self.stats.entry(user).or_default().chats_count += 1;
    }

    pub fn record_message(&mut self, user: UserId) {
        self.stats.entry(user).or_default().messages_sent += 1;
    }

    pub fn adjust_rating(&mut self, user: UserId, delta: i64) {
        self.stats.entry(user).or_default().rating += delta;
    }

    /// The user's display name, generated on first use.
    pub fn anonymous_name(&mut self, user: UserId) -> String {
        self.names
            .entry(user)
            .or_insert_with(|| generate_name(&mut rand::rng()))
            .clone()
    }

    /// Read-only name lookup for projections that must not mutate state.
    pub fn display_name(&self, user: UserId) -> String {
        self.names
            .get(&user)
            .cloned()
            .unwrap_or_else(|| format!("User-{}", user))
    }

    /// Most active users by chat count.
    pub fn top_users(&self, limit: usize) -> Vec<TopUser> {
        let mut ranked: Vec<_> = self.stats.iter().collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| {
            b.chats_count.cmp(&a.chats_count).then(a_id.cmp(b_id))
        });
        ranked
            .into_iter()
            .take(limit)
            .map(|(user, stats)| TopUser {
                name: self.display_name(*user),
                chats_count: stats.chats_count,
                messages_sent: stats.messages_sent,
                rating: stats.rating,
            })
            .collect()
    }
}

fn generate_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Anonymous");
    let noun = NOUNS.choose(rng).copied().unwrap_or("Stranger");
    format!("{} {}-{}", adjective, noun, rng.random_range(100..=999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_name_is_stable_per_user() {
        let mut store = StatsStore::new();
        let first = store.anonymous_name(UserId(1));
        assert_eq!(store.anonymous_name(UserId(1)), first);
        assert_eq!(store.display_name(UserId(1)), first);
        assert_eq!(store.display_name(UserId(2)), "User-2");
    }

    #[test]
    fn generated_names_follow_the_pattern() {
        let name = generate_name(&mut rand::rng());
        let (words, number) = name.rsplit_once('-').unwrap();
        let number: u32 = number.parse().unwrap();
        assert!((100..=999).contains(&number));
        let (adjective, noun) = words.split_once(' ').unwrap();
        assert!(ADJECTIVES.contains(&adjective));
        assert!(NOUNS.contains(&noun));
    }

    #[test]
    fn top_users_ranks_by_chat_count() {
        let mut store = StatsStore::new();
        store.record_chat(UserId(1));
        store.record_chat(UserId(2));
        store.record_chat(UserId(2));
        store.record_message(UserId(2));
        store.adjust_rating(UserId(1), -1);

        let top = store.top_users(10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "User-2");
        assert_eq!(top[0].chats_count, 2);
        assert_eq!(top[0].messages_sent, 1);
        assert_eq!(top[1].rating, -1);
        assert_eq!(store.top_users(1).len(), 1);
    }
}
