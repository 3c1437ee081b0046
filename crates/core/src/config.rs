//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Request handlers never read process-wide environment variables; the functions in this
//! module take the raw values as arguments so the binary decides where they come from.

use crate::constants::{
    BILLS_DIR_NAME, DEFAULT_DATA_DIR, DEFAULT_GATEWAY_TIMEOUT_SECS, DEFAULT_GEMINI_API_BASE,
    DEFAULT_GEMINI_MODEL, DEFAULT_RENDER_TIMEOUT_SECS, MAX_UPLOAD_BYTES, SERVERLESS_DATA_DIR,
    UPLOADS_DIR_NAME,
};
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection settings for the generative model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    gemini: Option<GeminiSettings>,
    gateway_timeout: Duration,
    render_timeout: Duration,
    max_upload_bytes: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if either timeout is zero.
    pub fn new(
        data_dir: PathBuf,
        gemini: Option<GeminiSettings>,
        gateway_timeout: Duration,
        render_timeout: Duration,
    ) -> CoreResult<Self> {
        if gateway_timeout.is_zero() || render_timeout.is_zero() {
            return Err(CoreError::InvalidInput(
                "timeouts must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            gemini,
            gateway_timeout,
            render_timeout,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_DIR_NAME)
    }

    pub fn bills_dir(&self) -> PathBuf {
        self.data_dir.join(BILLS_DIR_NAME)
    }

    pub fn gemini(&self) -> Option<&GeminiSettings> {
        self.gemini.as_ref()
    }

    pub fn gateway_timeout(&self) -> Duration {
        self.gateway_timeout
    }

    pub fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the data directory from an optional override.
///
/// Serverless hosts only allow writes under `/tmp`, so `serverless` switches the default.
pub fn data_dir_from_env_value(value: Option<String>, serverless: bool) -> PathBuf {
    match non_blank(value) {
        Some(dir) => PathBuf::from(dir),
        None if serverless => PathBuf::from(SERVERLESS_DATA_DIR),
        None => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

/// Build model settings from optional values. A missing or blank API key means no model.
pub fn gemini_settings_from_env_values(
    api_key: Option<String>,
    model: Option<String>,
    api_base: Option<String>,
) -> Option<GeminiSettings> {
    let api_key = non_blank(api_key)?;
    Some(GeminiSettings {
        api_key,
        model: non_blank(model).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        api_base: non_blank(api_base)
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
    })
}

/// Parse a timeout in whole seconds. `None` or blank yields `default_secs`.
///
/// # Errors
///
/// Returns `CoreError::InvalidInput` naming `name` if the value is not a positive integer.
pub fn timeout_from_env_value(
    name: &str,
    value: Option<String>,
    default_secs: u64,
) -> CoreResult<Duration> {
    let Some(raw) = non_blank(value) else {
        return Ok(Duration::from_secs(default_secs));
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(CoreError::InvalidInput(format!(
            "{name} must be a positive whole number of seconds, got '{raw}'"
        ))),
    }
}

/// Gateway timeout with the default applied.
pub fn gateway_timeout_from_env_value(value: Option<String>) -> CoreResult<Duration> {
    timeout_from_env_value(
        "MEDBILL_GATEWAY_TIMEOUT_SECS",
        value,
        DEFAULT_GATEWAY_TIMEOUT_SECS,
    )
}

/// Render timeout with the default applied.
pub fn render_timeout_from_env_value(value: Option<String>) -> CoreResult<Duration> {
    timeout_from_env_value(
        "MEDBILL_RENDER_TIMEOUT_SECS",
        value,
        DEFAULT_RENDER_TIMEOUT_SECS,
    )
}
