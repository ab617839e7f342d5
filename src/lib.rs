//! Anonymous one-on-one chat matchmaking.
//!
//! The engine pairs users with matching profiles, relays their messages,
//! ends pairs after a fixed time and keeps short-lived blacklists from
//! post-chat ratings. All state is in memory.

pub mod admin;
pub mod blacklist;
pub mod chat;
pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod interface;
pub mod matchmaker;
pub mod profile;
pub mod session;
pub mod spam;
pub mod stats;
pub mod store;
pub mod timer;
pub mod transport;
