use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Runtime configuration, read from `MURMUR_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub session_days: i64,
    /// How long an issued verification code stays valid.
    pub code_ttl: chrono::Duration,
    pub max_message_len: usize,
    /// Upper bound on every Notifier / SuggestionProvider call.
    pub external_timeout: Duration,
    pub notify: Option<NotifyConfig>,
    pub suggest: Option<SuggestConfig>,
}

/// HTTP mail API used to deliver verification codes.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub url: String,
    pub api_key: String,
    pub sender: String,
}

/// Text-generation endpoint used for message suggestions.
#[derive(Debug, Clone)]
pub struct SuggestConfig {
    pub url: String,
    pub api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            db_path: "murmur.db".into(),
            jwt_secret: String::new(),
            session_days: 30,
            code_ttl: chrono::Duration::hours(1),
            max_message_len: 300,
            external_timeout: Duration::from_secs(10),
            notify: None,
            suggest: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let jwt_secret = env_or("MURMUR_JWT_SECRET", "");
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MURMUR_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let notify = match (optional("MURMUR_NOTIFY_URL"), optional("MURMUR_NOTIFY_API_KEY")) {
            (Some(url), Some(api_key)) => Some(NotifyConfig {
                url,
                api_key,
                sender: env_or("MURMUR_NOTIFY_SENDER", "no-reply@murmur.local"),
            }),
            _ => None,
        };

        let suggest = match (optional("MURMUR_SUGGEST_URL"), optional("MURMUR_SUGGEST_API_KEY")) {
            (Some(url), Some(api_key)) => Some(SuggestConfig { url, api_key }),
            _ => None,
        };

        Ok(Self {
            host: env_or("MURMUR_HOST", &defaults.host),
            port: parsed("MURMUR_PORT", defaults.port)?,
            db_path: env_or("MURMUR_DB_PATH", "murmur.db").into(),
            jwt_secret,
            session_days: parsed("MURMUR_SESSION_DAYS", defaults.session_days)?,
            code_ttl: chrono::Duration::seconds(parsed("MURMUR_CODE_TTL_SECS", 3600)?),
            max_message_len: parsed("MURMUR_MAX_MESSAGE_LEN", defaults.max_message_len)?,
            external_timeout: Duration::from_secs(parsed("MURMUR_EXTERNAL_TIMEOUT_SECS", 10)?),
            notify,
            suggest,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(v) => v.parse().with_context(|| format!("invalid value for {key}: {v:?}")),
        None => Ok(default),
    }
}
