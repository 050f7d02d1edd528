use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub api_base_url: Url,
    pub debug: bool,
    /// Unset means the transport default applies.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_API_BASE_URL, APP_DEBUG, APP_REQUEST_TIMEOUT_SECS
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("debug", false)?
            .build()?;

        config.try_deserialize()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
