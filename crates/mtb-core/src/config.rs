use std::path::PathBuf;

use crate::{domain::UserId, errors::Error, Result};

/// Typed runtime configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// The single administrator: may ban/unban users and delete any listing.
    pub admin_id: UserId,
    /// Directory holding `listings.json` and `users.json`.
    pub data_dir: PathBuf,
    /// Offer the "no expiry" choice at the vigency step.
    pub allow_no_expiry: bool,
}

impl Config {
    /// Load `.env` (existing variables win) and then read the process environment.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_str = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .or_else(|| env_str("BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let admin_raw = env_str("ADMIN_ID").ok_or_else(|| {
            Error::Config("ADMIN_ID environment variable is required".to_string())
        })?;
        let admin_id = admin_raw
            .trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| Error::Config(format!("ADMIN_ID must be an integer, got {admin_raw:?}")))?;

        let data_dir = env_str("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let allow_no_expiry = env_str("ALLOW_NO_EXPIRY")
            .map(|s| parse_bool(&s))
            .unwrap_or(true);

        Ok(Self {
            telegram_bot_token,
            admin_id,
            data_dir,
            allow_no_expiry,
        })
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_id == user
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
