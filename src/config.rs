use std::env;
use std::net::SocketAddr;

use crate::error::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./budget_tracker.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Minimum length of the session signing key.
pub const MIN_SECRET_LENGTH: usize = 32;

pub const DEFAULT_SESSION_IDLE_SECS: i64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// HMAC key for the session cookie.
    pub session_secret: String,
    /// Gate for `POST /api/setup/admin`; `None` disables the endpoint.
    pub admin_setup_key: Option<String>,
    pub bcrypt_cost: u32,
    /// Sessions without a request for this long are forgotten.
    pub session_idle_secs: i64,
}

impl Config {
    pub fn new(
        database_url: impl Into<String>,
        session_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let session_secret = session_secret.into();
        if session_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::SecretTooShort {
                min: MIN_SECRET_LENGTH,
                actual: session_secret.len(),
            });
        }

        Ok(Self {
            database_url: database_url.into(),
            bind_addr: parse_addr(DEFAULT_BIND_ADDR)?,
            session_secret,
            admin_setup_key: None,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        })
    }

    /// Reads `DATABASE_URL`, `BIND_ADDR`, `SESSION_SECRET`, `ADMIN_SETUP_KEY`,
    /// `BCRYPT_COST` and `SESSION_IDLE_SECS`. Call `dotenvy::dotenv()` first
    /// to pick up a `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let session_secret =
            env::var("SESSION_SECRET").map_err(|_| ConfigError::Missing("SESSION_SECRET"))?;

        let mut config = Self::new(database_url, session_secret)?;

        if let Ok(addr) = env::var("BIND_ADDR") {
            config.bind_addr = parse_addr(&addr)?;
        }

        config.admin_setup_key = env::var("ADMIN_SETUP_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Ok(cost) = env::var("BCRYPT_COST") {
            config.bcrypt_cost = parse_number("BCRYPT_COST", &cost)?;
        }

        if let Ok(secs) = env::var("SESSION_IDLE_SECS") {
            config.session_idle_secs = parse_number("SESSION_IDLE_SECS", &secs)?;
        }

        Ok(config)
    }

    pub fn with_admin_setup_key(mut self, key: impl Into<String>) -> Self {
        self.admin_setup_key = Some(key.into());
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

pub fn parse_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        name: "BIND_ADDR",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secret_is_rejected() {
        let err = Config::new("sqlite::memory:", "too-short").unwrap_err();
        assert!(matches!(err, ConfigError::SecretTooShort { min: 32, actual: 9 }));
    }

    #[test]
    fn defaults_are_applied() {
        let config = Config::new("sqlite::memory:", "x".repeat(32)).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(config.admin_setup_key.is_none());
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.session_idle_secs, DEFAULT_SESSION_IDLE_SECS);
    }

    #[test]
    fn bad_bind_addr_is_reported() {
        assert!(matches!(
            parse_addr("not-an-addr"),
            Err(ConfigError::Invalid { name: "BIND_ADDR", .. })
        ));
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = parse_number::<i64>("SESSION_IDLE_SECS", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SESSION_IDLE_SECS", .. }));
        assert_eq!(parse_number::<u32>("BCRYPT_COST", " 10 ").unwrap(), 10);
    }
}
