//! Per-user conversation state machine.
//!
//! ```text
//! Idle -> FillingProfile -> Idle -> Searching -> Chatting -> Rating -> Idle
//! ```
//!
//! Handlers run synchronously against the locked [`SessionStore`] and return
//! an outbox; delivery happens after the lock is released, so a slow or
//! failing transport can never stall or roll back a committed transition.

use crate::{
    chat::{ChatSession, Payload},
    clock::Clock,
    config::SessionConfig,
    entity::UserId,
    error::MatchError,
    matchmaker::MatchOutcome,
    store::{AdminSnapshot, SessionStore, UserState},
    transport::{InboundEvent, Menu, Notice, Outbound, ProfileAnswer, Rating, Transport},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatSessionController {
    store: Arc<Mutex<SessionStore>>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    config: Arc<SessionConfig>,
}

impl ChatSessionController {
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(Mutex::new(SessionStore::new(&config))),
            transport,
            clock,
            config: Arc::new(config),
        }
    }

    /// A panic in one handler must not lock every other user out.
    fn lock(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn handle(&self, user: UserId, event: InboundEvent) {
        let outbox = self.apply(user, event);
        self.dispatch(outbox).await;
    }

    pub fn snapshot(&self) -> AdminSnapshot {
        self.lock().snapshot(self.clock.now())
    }

    pub fn state_of(&self, user: UserId) -> UserState {
        self.lock().state(user)
    }

    /// Housekeeping: forgets idle spam windows and expired blocks.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let mut store = self.lock();
        let windows = store.spam.sweep(now);
        let blocks = store.blacklist.purge_expired(now);
        if windows + blocks > 0 {
            debug!("Swept {} idle spam windows and {} expired blocks", windows, blocks);
        }
    }

    fn apply(&self, user: UserId, event: InboundEvent) -> Vec<Outbound> {
        let mut store = self.lock();
        match event {
            InboundEvent::Start => self.restart(&mut store, user),
            InboundEvent::ProfileAnswer(answer) => self.answer_profile(&mut store, user, answer),
            InboundEvent::SearchRequest => self.search(&mut store, user),
            InboundEvent::EndChatRequest => self.end_chat(&mut store, user),
            InboundEvent::RatingAnswer(rating) => self.rate(&mut store, user, rating),
            InboundEvent::Content(payload) => self.relay(&mut store, user, payload),
            InboundEvent::HelpRequest => {
                vec![Outbound::notice(user, Notice::Help, menu_for(&store, user))]
            }
            InboundEvent::StatsRequest => {
                info!("User {} viewed stats", user);
                let stats = store.stats.get(user);
                let name = store.stats.anonymous_name(user);
                vec![Outbound::notice(
                    user,
                    Notice::Stats { stats, name },
                    menu_for(&store, user),
                )]
            }
        }
    }

    fn restart(&self, store: &mut SessionStore, user: UserId) -> Vec<Outbound> {
        info!("User {} started over", user);
        let mut outbox = Vec::new();

        store.timers.cancel(user);
        if store.engine.remove_from_queue(user) {
            info!("User {} removed from waiting queue", user);
        }
        if let Some(session) = store.engine.end_pair(user) {
            if let Some(partner) = session.partner_of(user) {
                store.timers.cancel(partner);
                store.set_state(partner, UserState::Idle);
                info!("Chat {} <-> {} ended by restart", user, partner);
                outbox.push(Outbound::notice(partner, Notice::PartnerLeft, Menu::Main));
            }
        }

        store.profiles.clear(user);
        store.set_state(user, UserState::FillingProfile);
        outbox.push(Outbound::notice(user, Notice::Welcome, Menu::Gender));
        outbox
    }

    fn answer_profile(
        &self,
        store: &mut SessionStore,
        user: UserId,
        answer: ProfileAnswer,
    ) -> Vec<Outbound> {
        if store.state(user) != UserState::FillingProfile {
            debug!("Ignoring profile answer from {} outside the questionnaire", user);
            return Vec::new();
        }

        match answer {
            ProfileAnswer::Gender(gender) => {
                store.profiles.set_gender(user, gender);
                vec![Outbound::notice(user, Notice::AskAge, Menu::Age)]
            }
            ProfileAnswer::Age(_) if store.profiles.draft(user).gender.is_none() => {
                vec![Outbound::notice(user, Notice::AskGender, Menu::Gender)]
            }
            ProfileAnswer::Age(age) => {
                store.profiles.set_age(user, age);
                store.set_state(user, UserState::Idle);
                if let Some(profile) = store.profiles.get(user) {
                    info!("User {} completed profile ({})", user, profile);
                }
                vec![Outbound::notice(user, Notice::ProfileComplete, Menu::Main)]
            }
        }
    }

    fn search(&self, store: &mut SessionStore, user: UserId) -> Vec<Outbound> {
        info!("User {} is searching for a partner", user);
        if store.profiles.get(user).is_none() {
            debug!("User {} tried to search without a profile", user);
            return vec![Outbound::notice(user, Notice::ProfileRequired, Menu::Main)];
        }
        match store.state(user) {
            UserState::Chatting => {
                return vec![Outbound::notice(user, Notice::AlreadyChatting, Menu::Chat)]
            }
            UserState::Searching => {
                return vec![Outbound::notice(user, Notice::AlreadySearching, Menu::Main)]
            }
            _ => {}
        }

        let now = self.clock.now();
        let SessionStore {
            engine,
            profiles,
            blacklist,
            ..
        } = &mut *store;

        match engine.enqueue_or_match(user, profiles, blacklist, now) {
            Ok(MatchOutcome::Queued) => {
                store.set_state(user, UserState::Searching);
                info!(
                    "User {} added to waiting queue (total: {})",
                    user,
                    store.engine.queue_len()
                );
                vec![Outbound::notice(user, Notice::Waiting, Menu::Main)]
            }
            Ok(MatchOutcome::Matched(session)) => self.start_chat(store, session),
            Err(err) => {
                debug!("Search rejected: {}", err);
                let (notice, menu) = match err {
                    MatchError::IncompleteProfile(_) => (Notice::ProfileRequired, Menu::Main),
                    MatchError::AlreadyPaired(_) => (Notice::AlreadyChatting, Menu::Chat),
                    MatchError::AlreadyQueued(_) => (Notice::AlreadySearching, Menu::Main),
                };
                vec![Outbound::notice(user, notice, menu)]
            }
        }
    }

    fn start_chat(&self, store: &mut SessionStore, session: ChatSession) -> Vec<Outbound> {
        let (a, b, id) = (session.participant_a, session.participant_b, session.id);
        for user in [a, b] {
            store.set_state(user, UserState::Chatting);
            store.stats.record_chat(user);
        }

        let controller = self.clone();
        store
            .timers
            .schedule(a, b, id, self.config.chat_duration, move || async move {
                controller.expire(a, b, id).await
            });

        info!("Chat started: {} <-> {} (session {})", a, b, id);
        vec![
            Outbound::notice(a, Notice::PartnerFound, Menu::Chat),
            Outbound::notice(b, Notice::PartnerFound, Menu::Chat),
        ]
    }

    fn end_chat(&self, store: &mut SessionStore, user: UserId) -> Vec<Outbound> {
        if store.state(user) != UserState::Chatting {
            debug!("User {} asked to end a chat while not chatting", user);
            return vec![Outbound::notice(user, Notice::NotInChat, Menu::Main)];
        }

        let Some(partner) = store
            .engine
            .end_pair(user)
            .and_then(|session| session.partner_of(user))
        else {
            store.timers.cancel(user);
            store.set_state(user, UserState::Idle);
            return vec![Outbound::notice(user, Notice::ChatEnded, Menu::Main)];
        };

        store.timers.cancel(user);
        store.timers.cancel(partner);
        store.set_state(partner, UserState::Idle);
        store.set_state(user, UserState::Rating { partner });
        info!("Chat {} <-> {} ended manually", user, partner);

        let partner_name = store.stats.anonymous_name(partner);
        vec![
            Outbound::notice(user, Notice::RatePartner { partner_name }, Menu::Rating),
            Outbound::notice(partner, Notice::ChatEnded, Menu::Main),
        ]
    }

    fn rate(&self, store: &mut SessionStore, user: UserId, rating: Rating) -> Vec<Outbound> {
        let UserState::Rating { partner } = store.state(user) else {
            debug!("Ignoring rating from {} outside the rating step", user);
            return Vec::new();
        };

        match rating {
            Rating::Positive => store.stats.adjust_rating(partner, 1),
            Rating::Negative => {
                let now = self.clock.now();
                store
                    .blacklist
                    .block(user, partner, self.config.block_duration, now);
                store.stats.adjust_rating(partner, -1);
                info!("User {} blocked {} for {:?}", user, partner, self.config.block_duration);
            }
            Rating::Neutral => {}
        }
        info!("User {} rated {} as {:?}", user, partner, rating);

        store.set_state(user, UserState::Idle);
        vec![Outbound::notice(user, Notice::ThanksForRating, Menu::Main)]
    }

    fn relay(&self, store: &mut SessionStore, user: UserId, payload: Payload) -> Vec<Outbound> {
        match store.state(user) {
            UserState::Chatting => {}
            UserState::Searching => {
                return vec![Outbound::notice(user, Notice::Waiting, Menu::Main)]
            }
            UserState::FillingProfile => {
                return vec![Outbound::notice(
                    user,
                    Notice::FinishProfileFirst,
                    menu_for(store, user),
                )]
            }
            UserState::Rating { .. } => {
                return vec![Outbound::notice(user, Notice::RateFirst, Menu::Rating)]
            }
            UserState::Idle => {
                return vec![Outbound::notice(user, Notice::PressSearch, Menu::Main)]
            }
        }

        if store.spam.record_and_check(user, self.clock.now()) {
            debug!("User {} is over the message limit", user);
            return vec![Outbound::notice(user, Notice::SlowDown, Menu::Chat)];
        }

        let Some(partner) = store.engine.partner_of(user) else {
            warn!("User {} is marked as chatting without a partner", user);
            store.set_state(user, UserState::Idle);
            return vec![Outbound::notice(user, Notice::PressSearch, Menu::Main)];
        };

        if !payload.is_supported() {
            return vec![Outbound::notice(user, Notice::UnsupportedContent, Menu::Chat)];
        }

        store.stats.record_message(user);
        debug!("Relaying {} from {} to {}", payload.kind(), user, partner);
        vec![Outbound::relay(partner, payload)]
    }

    /// Timer callback. Acts only if `(a, b)` is still the same pair it was
    /// armed for; anything else means the chat already ended another way.
    async fn expire(&self, a: UserId, b: UserId, session_id: Uuid) {
        let outbox = {
            let mut store = self.lock();
            if !store.engine.is_current_pair(a, b, session_id) {
                debug!("Stale timer for session {} ignored", session_id);
                return;
            }
            store.engine.end_pair(a);
            for user in [a, b] {
                store.timers.cancel(user);
                store.set_state(user, UserState::Idle);
            }
            info!("Chat {} <-> {} auto-ended after {:?}", a, b, self.config.chat_duration);
            vec![
                Outbound::notice(a, Notice::AutoEnded, Menu::Main),
                Outbound::notice(b, Notice::AutoEnded, Menu::Main),
            ]
        };
        self.dispatch(outbox).await;
    }

    async fn dispatch(&self, outbox: Vec<Outbound>) {
        for outbound in outbox {
            if let Err(e) = self.transport.deliver(&outbound).await {
                warn!("Failed to deliver message to {}: {}", outbound.to, e);
            }
        }
    }
}

fn menu_for(store: &SessionStore, user: UserId) -> Menu {
    match store.state(user) {
        UserState::Idle | UserState::Searching => Menu::Main,
        UserState::FillingProfile if store.profiles.draft(user).gender.is_some() => Menu::Age,
        UserState::FillingProfile => Menu::Gender,
        UserState::Chatting => Menu::Chat,
        UserState::Rating { .. } => Menu::Rating,
    }
}
