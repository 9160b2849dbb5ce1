use std::{env, path::PathBuf, time::Duration};

use crate::error::ServerError;

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub persistence_enabled: bool,
    pub persist_timeout: Duration,
    pub upload_dir: PathBuf,
    pub max_content_length: usize,
    pub rules_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ServerError::Config(format!("PORT must be a port number, got `{raw}`")))?,
            None => 5000,
        };

        let persistence_enabled = !matches!(
            var("CHAT_PERSISTENCE")
                .map(|v| v.to_ascii_lowercase())
                .as_deref(),
            Some("off" | "false" | "0" | "disabled")
        );

        let persist_timeout = match var("PERSIST_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => {
                    return Err(ServerError::Config(format!(
                        "PERSIST_TIMEOUT_MS must be a positive number of milliseconds, got `{raw}`"
                    )))
                }
            },
            None => Duration::from_secs(2),
        };

        let max_content_length = match var("MAX_CONTENT_LENGTH") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ServerError::Config(format!("MAX_CONTENT_LENGTH must be bytes, got `{raw}`"))
            })?,
            None => DEFAULT_MAX_CONTENT_LENGTH,
        };

        Ok(Self {
            port,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://chatbot.db?mode=rwc".to_string()),
            persistence_enabled,
            persist_timeout,
            upload_dir: var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_content_length,
            rules_path: var("RULES_PATH").map(PathBuf::from),
        })
    }
}
