use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Runtime configuration, sourced from the environment at startup.
///
/// Any missing or unparsable required setting is fatal: the process must
/// not begin polling with a partial configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub webhook_url: String,
    pub pack_id: i64,
    pub pack_start: DateTime<Utc>,
    pub pack_end: DateTime<Utc>,
    pub poll_interval: Duration,
    pub user_delay: Duration,
    pub fetch_limit: u32,
    pub max_attempts: u32,
    pub bind_addr: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("pack window is empty: start {start} is not before end {end}")]
    EmptyWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

const DEFAULT_POLL_INTERVAL_SECS: u64 = 15 * 60;
const DEFAULT_USER_DELAY_SECS: u64 = 5;
const DEFAULT_FETCH_LIMIT: u32 = 100;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration through an injected variable lookup,
    /// so tests don't have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let pack_start = parse_instant("PACK_START_TIME", required("PACK_START_TIME")?)?;
        let pack_end = parse_instant("PACK_END_TIME", required("PACK_END_TIME")?)?;
        if pack_start >= pack_end {
            return Err(ConfigError::EmptyWindow {
                start: pack_start,
                end: pack_end,
            });
        }

        let poll_interval_secs = match lookup("POLL_INTERVAL_SECS") {
            Some(raw) => parse_number::<u64>("POLL_INTERVAL_SECS", raw)?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        let user_delay_secs = match lookup("USER_DELAY_SECS") {
            Some(raw) => parse_number::<u64>("USER_DELAY_SECS", raw)?,
            None => DEFAULT_USER_DELAY_SECS,
        };
        let fetch_limit = match lookup("FETCH_LIMIT") {
            Some(raw) => parse_number::<u32>("FETCH_LIMIT", raw)?,
            None => DEFAULT_FETCH_LIMIT,
        };
        let max_attempts = match lookup("MAX_RETRY_ATTEMPTS") {
            Some(raw) => parse_number::<u32>("MAX_RETRY_ATTEMPTS", raw)?,
            None => DEFAULT_MAX_ATTEMPTS,
        };
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_RETRY_ATTEMPTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            webhook_url: required("WEBHOOK_URL")?,
            pack_id: parse_number("CURRENT_PACK", required("CURRENT_PACK")?)?,
            pack_start,
            pack_end,
            poll_interval: Duration::from_secs(poll_interval_secs),
            user_delay: Duration::from_secs(user_delay_secs),
            fetch_limit,
            max_attempts,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

fn parse_instant(name: &'static str, raw: String) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ConfigError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        })
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://postgres@localhost/unpack"),
            ("CLIENT_ID", "1234"),
            ("CLIENT_SECRET", "hunter2"),
            ("WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc"),
            ("CURRENT_PACK", "2"),
            ("PACK_START_TIME", "2024-01-01T00:00:00Z"),
            ("PACK_END_TIME", "2024-02-01T00:00:00Z"),
        ])
    }

    fn lookup_in(
        env: HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Option<String> {
        move |name| env.get(name).map(|v| v.to_string())
    }

    #[test]
    fn loads_with_defaults() {
        let config = Config::from_lookup(lookup_in(full_env())).unwrap();

        assert_eq!(config.pack_id, 2);
        assert_eq!(config.poll_interval, Duration::from_secs(15 * 60));
        assert_eq!(config.user_delay, Duration::from_secs(5));
        assert_eq!(config.fetch_limit, 100);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn overrides_intervals() {
        let mut env = full_env();
        env.insert("POLL_INTERVAL_SECS", "60");
        env.insert("USER_DELAY_SECS", "1");
        env.insert("FETCH_LIMIT", "50");

        let config = Config::from_lookup(lookup_in(env)).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.user_delay, Duration::from_secs(1));
        assert_eq!(config.fetch_limit, 50);
    }

    #[test]
    fn missing_required_variable_is_fatal() {
        let mut env = full_env();
        env.remove("WEBHOOK_URL");

        let err = Config::from_lookup(lookup_in(env)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WEBHOOK_URL")));
    }

    #[test]
    fn unparsable_pack_window_is_fatal() {
        let mut env = full_env();
        env.insert("PACK_START_TIME", "next tuesday");

        let err = Config::from_lookup(lookup_in(env)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "PACK_START_TIME",
                ..
            }
        ));
    }

    #[test]
    fn inverted_pack_window_is_fatal() {
        let mut env = full_env();
        env.insert("PACK_START_TIME", "2024-03-01T00:00:00Z");

        let err = Config::from_lookup(lookup_in(env)).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyWindow { .. }));
    }

    #[test]
    fn zero_retry_attempts_rejected() {
        let mut env = full_env();
        env.insert("MAX_RETRY_ATTEMPTS", "0");

        let err = Config::from_lookup(lookup_in(env)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "MAX_RETRY_ATTEMPTS",
                ..
            }
        ));
    }
}
