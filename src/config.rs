use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_RESET_DELAY_MS: u64 = 3000;
pub const DEFAULT_FORM_IDLE_TTL_SECS: u64 = 1800;
pub const DEFAULT_SUBMISSION_TIMEOUT_SECS: u64 = 30;

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub session_key: Option<String>,
    pub reset_delay: Duration,
    pub form_idle_ttl: Duration,
    pub submission_endpoint: Option<String>,
    pub submission_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_key: None,
            reset_delay: Duration::from_millis(DEFAULT_RESET_DELAY_MS),
            form_idle_ttl: Duration::from_secs(DEFAULT_FORM_IDLE_TTL_SECS),
            submission_endpoint: None,
            submission_timeout: Duration::from_secs(DEFAULT_SUBMISSION_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env loaded: {e}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            session_key: get("SESSION_KEY"),
            reset_delay: Duration::from_millis(parse_or(
                get("RESET_DELAY_MS"),
                "RESET_DELAY_MS",
                DEFAULT_RESET_DELAY_MS,
            )),
            form_idle_ttl: Duration::from_secs(parse_or(
                get("FORM_IDLE_TTL_SECS"),
                "FORM_IDLE_TTL_SECS",
                DEFAULT_FORM_IDLE_TTL_SECS,
            )),
            submission_endpoint: get("SUBMISSION_ENDPOINT"),
            submission_timeout: Duration::from_secs(parse_or(
                get("SUBMISSION_TIMEOUT_SECS"),
                "SUBMISSION_TIMEOUT_SECS",
                DEFAULT_SUBMISSION_TIMEOUT_SECS,
            )),
        }
    }
}

fn parse_or(value: Option<String>, key: &str, default: u64) -> u64 {
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Invalid {key}={raw:?}, using default {default}");
            default
        }),
    }
}
