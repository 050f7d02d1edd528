pub mod admin_api;
pub mod client;
pub mod duration;
pub mod error;
pub mod expiry;
pub mod models;
pub mod session;
pub mod settings;
pub mod user_api;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use crate::client::{ApiClient, ApiRequest, FilePart, MultipartForm, RequestBody};
pub use crate::duration::{DurationError, ExerciseDuration};
pub use crate::error::{ApiError, GENERIC_FAILURE_MESSAGE};
pub use crate::expiry::{ExpiryOutcome, ExpiryPrompt, ExpiryState, SessionExpiryHandler};
pub use crate::session::{BearerToken, Identity, MemorySession, SessionError, SessionProvider};
pub use crate::settings::Settings;

/// Installs the global fmt subscriber. `RUST_LOG` wins over the `debug` setting.
pub fn init_tracing(settings: &Settings) {
    let default_level = if settings.debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .try_init();
}

/// Loads settings from the environment and wires a client around the given session and prompt.
pub fn connect(
    session: Arc<dyn SessionProvider>,
    prompt: Arc<dyn ExpiryPrompt>,
) -> Result<ApiClient, Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing(&settings);

    let expiry = Arc::new(SessionExpiryHandler::new(session.clone(), prompt));
    let client = ApiClient::from_settings(&settings, session, expiry)?;
    info!(base_url = %settings.api_base_url, "API client ready");
    Ok(client)
}
