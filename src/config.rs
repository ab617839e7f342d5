use anyhow::{Context, Result};
use std::{env, net::SocketAddr, str::FromStr, time::Duration};

pub const SECS_PER_DAY: u64 = 24 * 60 * 60;

pub const DEFAULT_CHAT_DURATION: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_BLOCK_DURATION: Duration = Duration::from_secs(10 * SECS_PER_DAY);
pub const DEFAULT_SPAM_LIMIT: usize = 5;
pub const DEFAULT_SPAM_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";
/// How often idle spam windows and expired blocks are dropped.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Matchmaking policy knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a pair may chat before it is ended automatically.
    pub chat_duration: Duration,
    /// How long a negative rating keeps two users apart.
    pub block_duration: Duration,
    pub spam_limit: usize,
    pub spam_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chat_duration: DEFAULT_CHAT_DURATION,
            block_duration: DEFAULT_BLOCK_DURATION,
            spam_limit: DEFAULT_SPAM_LIMIT,
            spam_window: DEFAULT_SPAM_WINDOW,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub http_addr: SocketAddr,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN")
            .or_else(|_| env::var("TELOXIDE_TOKEN"))
            .map_err(|_| anyhow::anyhow!("BOT_TOKEN or TELOXIDE_TOKEN must be set"))?;

        let session = SessionConfig {
            chat_duration: Duration::from_secs(env_or(
                "CHAT_DURATION_SECS",
                DEFAULT_CHAT_DURATION.as_secs(),
            )?),
            block_duration: Duration::from_secs(
                env_or("BLOCK_DURATION_DAYS", DEFAULT_BLOCK_DURATION.as_secs() / SECS_PER_DAY)?
                    .saturating_mul(SECS_PER_DAY),
            ),
            spam_limit: env_or("SPAM_LIMIT", DEFAULT_SPAM_LIMIT)?,
            spam_window: Duration::from_secs(env_or(
                "SPAM_WINDOW_SECS",
                DEFAULT_SPAM_WINDOW.as_secs(),
            )?),
        };

        let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = http_addr
            .parse()
            .with_context(|| format!("HTTP_ADDR is not a socket address: {}", http_addr))?;

        Ok(Self {
            bot_token,
            http_addr,
            session,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_policy() {
        let config = SessionConfig::default();
        assert_eq!(config.chat_duration, Duration::from_secs(1800));
        assert_eq!(config.block_duration, Duration::from_secs(864_000));
        assert_eq!(config.spam_limit, 5);
        assert_eq!(config.spam_window, Duration::from_secs(10));
    }

    #[test]
    fn env_or_falls_back_and_rejects_garbage() {
        assert_eq!(env_or("DUET_TEST_UNSET_VARIABLE", 7usize).unwrap(), 7);

        env::set_var("DUET_TEST_GARBAGE_VARIABLE", "five");
        let err = env_or::<usize>("DUET_TEST_GARBAGE_VARIABLE", 5).unwrap_err();
        assert!(err.to_string().contains("DUET_TEST_GARBAGE_VARIABLE"));
        env::remove_var("DUET_TEST_GARBAGE_VARIABLE");
    }

    #[test]
    fn from_env_reads_overrides() {
        let vars = [
            ("BOT_TOKEN", "123:abc"),
            ("CHAT_DURATION_SECS", "60"),
            ("BLOCK_DURATION_DAYS", "2"),
            ("SPAM_LIMIT", "3"),
            ("SPAM_WINDOW_SECS", "4"),
            ("HTTP_ADDR", "0.0.0.0:9000"),
        ];
        for (key, value) in vars {
            env::set_var(key, value);
        }

        let config = Config::from_env();
        for (key, _) in vars {
            env::remove_var(key);
        }
        let config = config.unwrap();

        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.http_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.session.chat_duration, Duration::from_secs(60));
        assert_eq!(config.session.block_duration, Duration::from_secs(2 * SECS_PER_DAY));
        assert_eq!(config.session.spam_limit, 3);
        assert_eq!(config.session.spam_window, Duration::from_secs(4));
    }
}
