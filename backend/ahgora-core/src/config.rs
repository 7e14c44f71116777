// src/config.rs

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::assembler::DEFAULT_DATETIME_FORMAT;
use crate::auth::Credentials;
use crate::backend::{Backend, AHGORA_BASE_URL};
use crate::http::{HttpClientConfig, DEFAULT_TIMEOUT_SECS};

pub const ENV_PREFIX: &str = "AHGORA_";

fn default_base_url() -> String {
    AHGORA_BASE_URL.to_string()
}

fn default_datetime_format() -> String {
    DEFAULT_DATETIME_FORMAT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Settings read from `AHGORA_*` environment variables.
#[derive(Clone, Deserialize)]
pub struct AhgoraConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub company: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AhgoraConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        envy::prefixed(ENV_PREFIX).from_env::<AhgoraConfig>()
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(pairs)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.company, &self.username, &self.password)
    }

    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            ..HttpClientConfig::default()
        }
    }
}

impl fmt::Debug for AhgoraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AhgoraConfig")
            .field("base_url", &self.base_url)
            .field("company", &self.company)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("backend", &self.backend)
            .field("datetime_format", &self.datetime_format)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
