//! Environment-driven configuration.
//!
//! Loaded once at startup, read-only afterwards. The token signing secret is
//! required; starting without it is a fatal error.

use anyhow::{bail, Context};
use stratboard_gateway::DurationTable;
use time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Process-wide token signing secret. Never rotated at runtime; a key
    /// rotation requires a coordinated restart.
    pub token_secret: String,
    pub token_durations: DurationTable,
    pub allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let token_secret =
            std::env::var("TOKEN_SECRET").context("TOKEN_SECRET is required at startup")?;
        if token_secret.len() < 32 {
            bail!("TOKEN_SECRET must be at least 32 characters");
        }

        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

        let defaults = DurationTable::default();
        let token_durations = DurationTable {
            default: env_days("TOKEN_TTL_DEFAULT_DAYS", defaults.default)?,
            activation: env_days("TOKEN_TTL_ACTIVATION_DAYS", defaults.activation)?,
            reset: env_days("TOKEN_TTL_RESET_DAYS", defaults.reset)?,
        };

        Ok(Self {
            database_url,
            bind_address,
            token_secret,
            token_durations,
            allowed_origins,
        })
    }
}

fn env_days(name: &str, default: Duration) -> anyhow::Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => {
            let days: i64 = raw
                .parse()
                .with_context(|| format!("{name} must be a whole number of days"))?;
            if days <= 0 {
                bail!("{name} must be positive");
            }
            Ok(Duration::days(days))
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_days_falls_back_to_default() {
        let d = env_days("STRATBOARD_TEST_UNSET_VAR", Duration::days(30)).unwrap();
        assert_eq!(d, Duration::days(30));
    }
}
