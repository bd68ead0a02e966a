use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::session::ControllerConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bridge_url: String,
    pub bridge_api_key: Option<String>,
    pub session_id: String,
    pub reconnect_delay: Duration,
    pub max_backoff: Duration,
    pub restart_grace_period: Duration,
    pub event_queue_capacity: usize,
    pub bridge_poll_interval: Duration,
    pub chat_id_suffix: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: parse_var("PORT", 3000)?,
            bridge_url: env::var("BRIDGE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            bridge_api_key: env::var("BRIDGE_API_KEY").ok().filter(|k| !k.is_empty()),
            session_id: env::var("SESSION_ID").unwrap_or_else(|_| "default".to_string()),
            reconnect_delay: Duration::from_secs(parse_var("RECONNECT_DELAY_SECS", 5)?),
            max_backoff: Duration::from_secs(parse_var("MAX_BACKOFF_SECS", 60)?),
            restart_grace_period: Duration::from_secs(parse_var("RESTART_GRACE_SECS", 10)?),
            event_queue_capacity: parse_var("EVENT_QUEUE_CAPACITY", 64)?,
            bridge_poll_interval: Duration::from_millis(parse_var(
                "BRIDGE_POLL_INTERVAL_MS",
                1000,
            )?),
            chat_id_suffix: env::var("CHAT_ID_SUFFIX").unwrap_or_else(|_| "@c.us".to_string()),
        })
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            reconnect_delay: self.reconnect_delay,
            max_backoff: self.max_backoff,
            restart_grace_period: self.restart_grace_period,
            event_queue_capacity: self.event_queue_capacity,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}
