//! Environment configuration

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    /// Base URL of the room API; the in-memory backend is used when unset
    pub api_url: Option<String>,
    pub api_secret: String,
    pub backend_timeout: Duration,
    pub backend_attempts: u32,
    /// Quiet period after which a session runtime is retired
    pub idle_timeout: Duration,
    /// Saved stacks older than this are discarded
    pub session_ttl: Duration,
    /// User id the console acts as
    pub console_user: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: u64| -> u64 {
            match lookup(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    tracing::warn!(key, value = %raw, default, "Ignoring unparsable setting");
                    default
                }),
                None => default,
            }
        };

        let db_path = lookup("ROOMBOT_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.roombot/sessions.db"))
            },
            PathBuf::from,
        );

        Self {
            db_path,
            api_url: lookup("ROOMBOT_API_URL").filter(|url| !url.trim().is_empty()),
            api_secret: lookup("ROOMBOT_API_SECRET").unwrap_or_default(),
            backend_timeout: Duration::from_millis(number("ROOMBOT_BACKEND_TIMEOUT_MS", 5000)),
            backend_attempts: u32::try_from(number("ROOMBOT_BACKEND_ATTEMPTS", 3))
                .unwrap_or(3)
                .max(1),
            idle_timeout: Duration::from_secs(number("ROOMBOT_IDLE_SECS", 300)),
            session_ttl: Duration::from_secs(number("ROOMBOT_SESSION_TTL_SECS", 86_400)),
            console_user: i64::try_from(number("ROOMBOT_CONSOLE_USER", 1)).unwrap_or(1),
        }
    }
}
