use std::env;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_REQUEST_TIMEOUT_S: f64 = 90.0;

pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Explicit key; wins over the environment.
    pub api_key: Option<String>,
    pub text_model: String,
    pub image_model: String,
    pub image_enabled: bool,
    /// Per-request transport timeout handed to the HTTP client.
    pub request_timeout_s: f64,
    /// Environment variables consulted for the key when none is configured.
    pub api_key_env: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_enabled: true,
            request_timeout_s: DEFAULT_REQUEST_TIMEOUT_S,
            api_key_env: API_KEY_ENV_VARS.iter().map(|key| key.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Resolves the credential: explicit config, then environment, else `None`.
    ///
    /// Called per generation so a key exported after startup is picked up.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| self.api_key_env.iter().find_map(|key| non_empty_env(key)))
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
