use super::retry::RetryConfig;
use super::server::ServerConfig;
use crate::constants::{
    API_KEY_ENV, DEFAULT_AGENT_NAME, DEFAULT_APP_NAME, DEFAULT_BULK_THRESHOLD,
    DEFAULT_GEMINI_API_PATH, DEFAULT_GEMINI_ENDPOINT, DEFAULT_INSTRUCTION, DEFAULT_MAX_LLM_CALLS,
    DEFAULT_MODEL, DEFAULT_USER_ID, OUTPUT_PATH_ENV,
};
use std::fmt;
use std::path::{Path, PathBuf};

/// Values read from the environment at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub output_path: PathBuf,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("output_path", &self.output_path)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub user_id: String,
    pub agent_name: String,
    pub model: String,
    pub endpoint: String,
    pub api_path: String,
    pub instruction: String,
    pub bulk_threshold: u32,
    pub max_llm_calls: u32,
    pub retry: RetryConfig,
    pub image_server: ServerConfig,
    pub credentials: Credentials,
}

impl AppConfig {
    /// Load configuration from a TOML file (or defaults) plus the required
    /// environment values.
    pub fn load(path: Option<&Path>) -> Result<Self, super::ConfigError> {
        super::loader::load_config(path)
    }

    /// Built-in defaults around the given credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        let mut image_server = ServerConfig::default();
        image_server.env = server_env(&credentials);
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            api_path: DEFAULT_GEMINI_API_PATH.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            bulk_threshold: DEFAULT_BULK_THRESHOLD,
            max_llm_calls: DEFAULT_MAX_LLM_CALLS,
            retry: RetryConfig::default(),
            image_server,
            credentials,
        }
    }
}

/// Environment handed to the image server: the Gemini key under the name the
/// server expects, and the output directory.
pub(crate) fn server_env(credentials: &Credentials) -> std::collections::HashMap<String, String> {
    [
        ("GEMINI_API_KEY".to_string(), credentials.api_key.clone()),
        (
            OUTPUT_PATH_ENV.to_string(),
            credentials.output_path.display().to_string(),
        ),
    ]
    .into_iter()
    .collect()
}

pub(crate) fn required_env_names() -> [&'static str; 2] {
    [API_KEY_ENV, OUTPUT_PATH_ENV]
}
