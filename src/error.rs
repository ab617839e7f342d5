use crate::entity::UserId;
use thiserror::Error;

/// Caller-side precondition failures of the match engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("user {0} has not completed the profile")]
    IncompleteProfile(UserId),

    #[error("user {0} is already waiting for a partner")]
    AlreadyQueued(UserId),

    #[error("user {0} is already in a chat")]
    AlreadyPaired(UserId),
}

/// Failure to hand an outbound message to the transport.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("user {user} blocked the bot")]
    Blocked { user: UserId },

    #[error("user {user} is unreachable: {reason}")]
    Unreachable { user: UserId, reason: String },

    #[error("payload type {kind} cannot be delivered")]
    Unsupported { kind: &'static str },

    #[error("transport error: {0}")]
    Transport(String),
}
