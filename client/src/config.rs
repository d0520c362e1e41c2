use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::auth::StorageKeys;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub session_keys: StorageKeys,
    pub session_file: PathBuf,
    pub request_timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_base_url).context("API_BASE_URL must be an absolute URL")?;

        let session_keys = match lookup("SESSION_SCOPE").as_deref() {
            None | Some("customer") => StorageKeys::CUSTOMER,
            Some("admin") => StorageKeys::ADMIN,
            Some(other) => anyhow::bail!("SESSION_SCOPE must be 'customer' or 'admin', got '{}'", other),
        };

        let session_file = match lookup("SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => dirs::data_local_dir()
                .context("No local data directory; set SESSION_FILE")?
                .join("busline")
                .join("session.json"),
        };

        let request_timeout = lookup("REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>().context("REQUEST_TIMEOUT_SECS must be a number"))
            .transpose()?
            .map(Duration::from_secs);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        };

        Ok(Self {
            api_base_url,
            session_keys,
            session_file,
            request_timeout,
            log_format,
        })
    }
}
