use crate::chat::Payload;
use crate::entity::{AgeBracket, Gender, UserId};
use crate::error::DeliveryError;
use crate::stats::UserStats;
use async_trait::async_trait;
use std::fmt;

/// Something a user did, already decoded from the transport's wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Start,
    ProfileAnswer(ProfileAnswer),
    SearchRequest,
    EndChatRequest,
    RatingAnswer(Rating),
    Content(Payload),
    HelpRequest,
    StatsRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAnswer {
    Gender(Gender),
    Age(AgeBracket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Positive,
    Negative,
    Neutral,
}

/// Reply keyboard to show alongside a notice. Rendering is up to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Main,
    Gender,
    Age,
    Chat,
    Rating,
}

/// Every system-authored message a user can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Welcome,
    AskAge,
    AskGender,
    ProfileComplete,
    ProfileRequired,
    AlreadyChatting,
    AlreadySearching,
    Waiting,
    PartnerFound,
    NotInChat,
    RatePartner { partner_name: String },
    ChatEnded,
    PartnerLeft,
    AutoEnded,
    ThanksForRating,
    SlowDown,
    UnsupportedContent,
    FinishProfileFirst,
    RateFirst,
    PressSearch,
    Help,
    Stats { stats: UserStats, name: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Welcome => write!(
                f,
                "Hi! Here you can talk one-on-one, anonymously.\n\n\
                 First fill in a short profile so we can find you a better match.\n\
                 Choose your gender:"
            ),
            Notice::AskAge => write!(f, "Choose your age:"),
            Notice::AskGender => write!(f, "Please choose your gender first:"),
            Notice::ProfileComplete => write!(
                f,
                "Profile complete! You can now look for a partner.\n\
                 Press 'Find a partner' to begin."
            ),
            Notice::ProfileRequired => write!(f, "Fill in your profile first! Send /start"),
            Notice::AlreadyChatting => write!(f, "You are already in a chat!"),
            Notice::AlreadySearching => write!(f, "You are already looking for a partner..."),
            Notice::Waiting => write!(f, "Waiting for a partner..."),
            Notice::PartnerFound => write!(f, "Partner found! Say hello."),
            Notice::NotInChat => write!(f, "You are not in a chat."),
            Notice::RatePartner { partner_name } => {
                write!(f, "How was your chat with {}?", partner_name)
            }
            Notice::ChatEnded => write!(f, "Chat ended. You can look for a new partner!"),
            Notice::PartnerLeft => write!(f, "Your partner left the chat."),
            Notice::AutoEnded => write!(
                f,
                "The chat ended automatically after its time ran out. You can look for a new partner!"
            ),
            Notice::ThanksForRating => {
                write!(f, "Thanks for the rating! You can look for a new partner.")
            }
            Notice::SlowDown => write!(f, "Too many messages! Wait a moment."),
            Notice::UnsupportedContent => write!(f, "This message type is not supported yet."),
            Notice::FinishProfileFirst => write!(f, "Finish filling in your profile first!"),
            Notice::RateFirst => write!(f, "Rate your partner first!"),
            Notice::PressSearch => write!(f, "Press 'Find a partner' to start a chat."),
            Notice::Help => write!(
                f,
                "🔒 Anonymous one-on-one chat\n\n\
                 • Your personal data and ID are never revealed.\n\
                 • Every message is relayed by the bot.\n\
                 • You can end a chat at any moment.\n\
                 • Chats end automatically after a while.\n\n\
                 Press 'Find a partner' to begin!"
            ),
            Notice::Stats { stats, name } => write!(
                f,
                "📊 Your stats:\n\n\
                 💬 Chats: {}\n\
                 📝 Messages sent: {}\n\
                 ⭐ Rating: {}\n\
                 🆔 Your nickname: {}",
                stats.chats_count, stats.messages_sent, stats.rating, name
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Notice { notice: Notice, menu: Menu },
    Relay(Payload),
}

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: UserId,
    pub message: OutboundMessage,
}

impl Outbound {
    pub fn notice(to: UserId, notice: Notice, menu: Menu) -> Self {
        Self {
            to,
            message: OutboundMessage::Notice { notice, menu },
        }
    }

    pub fn relay(to: UserId, payload: Payload) -> Self {
        Self {
            to,
            message: OutboundMessage::Relay(payload),
        }
    }
}

/// Delivery side of the messaging platform.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, outbound: &Outbound) -> Result<(), DeliveryError>;
}

#[cfg(test)]
pub use recording::RecordingTransport;

#[cfg(test)]
mod recording {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Captures deliveries; recipients listed as unreachable fail instead.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        delivered: Mutex<Vec<Outbound>>,
        unreachable: Mutex<HashSet<UserId>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn make_unreachable(&self, user: UserId) {
            self.unreachable.lock().unwrap().insert(user);
        }

        /// Drains everything delivered so far.
        pub fn take(&self) -> Vec<Outbound> {
            std::mem::take(&mut *self.delivered.lock().unwrap())
        }

        pub fn notices_for(&self, user: UserId) -> Vec<Notice> {
            self.delivered
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.to == user)
                .filter_map(|o| match &o.message {
                    OutboundMessage::Notice { notice, .. } => Some(notice.clone()),
                    OutboundMessage::Relay(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn deliver(&self, outbound: &Outbound) -> Result<(), DeliveryError> {
            if self.unreachable.lock().unwrap().contains(&outbound.to) {
                return Err(DeliveryError::Unreachable {
                    user: outbound.to,
                    reason: "test".into(),
                });
            }
            self.delivered.lock().unwrap().push(outbound.clone());
            Ok(())
        }
    }
}
