use crate::entity::UserId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Content relayed between two partners. Media is carried by the transport's
/// own file handle so it can be re-sent without downloading.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Document {
        file_id: String,
        caption: Option<String>,
    },
    Voice {
        file_id: String,
    },
    Sticker {
        file_id: String,
    },
    Video {
        file_id: String,
        caption: Option<String>,
    },
    Audio {
        file_id: String,
        caption: Option<String>,
    },
    Contact {
        phone_number: String,
        first_name: String,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
    Venue {
        latitude: f64,
        longitude: f64,
        title: String,
        address: String,
    },
    Animation {
        file_id: String,
        caption: Option<String>,
    },
    VideoNote {
        file_id: String,
    },
    Unsupported,
}

impl Payload {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Payload::Unsupported)
    }

    /// Short label for logs; never includes the content itself.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Photo { .. } => "photo",
            Payload::Document { .. } => "document",
            Payload::Voice { .. } => "voice",
            Payload::Sticker { .. } => "sticker",
            Payload::Video { .. } => "video",
            Payload::Audio { .. } => "audio",
            Payload::Contact { .. } => "contact",
            Payload::Location { .. } => "location",
            Payload::Venue { .. } => "venue",
            Payload::Animation { .. } => "animation",
            Payload::VideoNote { .. } => "video_note",
            Payload::Unsupported => "unsupported",
        }
    }
}

/// One active pair. The same value is stored under both participants.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: Uuid,
    pub participant_a: UserId,
    pub participant_b: UserId,
    pub started_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(participant_a: UserId, participant_b: UserId, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant_a,
            participant_b,
            started_at,
        }
    }

    /// The other side of the pair, or `None` if `user` is not a participant.
    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        if user == self.participant_a {
            Some(self.participant_b)
        } else if user == self.participant_b {
            Some(self.participant_a)
        } else {
            None
        }
    }

    pub fn involves(&self, a: UserId, b: UserId) -> bool {
        self.partner_of(a) == Some(b)
    }
}
