use super::app::{AppConfig, Credentials, required_env_names, server_env};
use super::error::ConfigError;
use super::retry::RetryConfig;
use super::server::{RawServer, ServerConfig};
use crate::constants::{API_KEY_ENV, CONFIG_PATH, ENV_PATH, OUTPUT_PATH_ENV};
use dotenvy::from_filename;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(super) struct RawConfig {
    pub app_name: Option<String>,
    pub user_id: Option<String>,
    pub agent_name: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_path: Option<String>,
    pub instruction: Option<String>,
    pub bulk_threshold: Option<u32>,
    pub max_llm_calls: Option<u32>,
    pub retry: Option<RetryConfig>,
    pub image_server: Option<RawServer>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
        let _ = dotenvy::dotenv();
    });
}

/// Load and validate configuration.
///
/// Without an explicit path the default file is optional; an explicit path
/// must exist.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let credentials = credentials_from_env()?;
    let raw = match path {
        Some(path) => read_config(path)?,
        None => match read_config(Path::new(CONFIG_PATH)) {
            Err(ConfigError::NotFound { .. }) => {
                debug!("No configuration file found, using defaults");
                RawConfig::default()
            }
            other => other?,
        },
    };
    validate_and_build(raw, credentials)
}

/// Read the required values from the process environment.
pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    let read = |name: &str| -> Result<String, ConfigError> {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv {
                name: name.to_string(),
            })
    };
    debug!(required = ?required_env_names(), "Resolving environment configuration");
    Ok(Credentials {
        api_key: read(API_KEY_ENV)?,
        output_path: PathBuf::from(read(OUTPUT_PATH_ENV)?),
    })
}

fn read_config(path: &Path) -> Result<RawConfig, ConfigError> {
    debug!(path = %path.display(), "Reading coordinator configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn validate_and_build(
    parsed: RawConfig,
    credentials: Credentials,
) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::with_credentials(credentials);

    if let Some(app_name) = parsed.app_name {
        config.app_name = non_empty("app_name", app_name)?;
    }
    if let Some(user_id) = parsed.user_id {
        config.user_id = non_empty("user_id", user_id)?;
    }
    if let Some(agent_name) = parsed.agent_name {
        config.agent_name = non_empty("agent_name", agent_name)?;
    }
    if let Some(model) = parsed.model {
        config.model = non_empty("model", model)?;
    }
    if let Some(endpoint) = parsed.endpoint {
        config.endpoint = non_empty("endpoint", endpoint)?;
    }
    if let Some(api_path) = parsed.api_path {
        config.api_path = non_empty("api_path", api_path)?;
    }
    if let Some(instruction) = parsed.instruction {
        config.instruction = instruction;
    }
    if let Some(threshold) = parsed.bulk_threshold {
        config.bulk_threshold = threshold;
    }
    if let Some(max_llm_calls) = parsed.max_llm_calls {
        if max_llm_calls == 0 {
            return Err(ConfigError::invalid("max_llm_calls", "must be at least 1"));
        }
        config.max_llm_calls = max_llm_calls;
    }
    if let Some(retry) = parsed.retry {
        if retry.attempts == 0 {
            return Err(ConfigError::invalid("retry.attempts", "must be at least 1"));
        }
        if retry.initial_delay_secs < 0.0 || retry.exp_base < 1.0 {
            return Err(ConfigError::invalid(
                "retry",
                "initial_delay_secs must be >= 0 and exp_base >= 1",
            ));
        }
        if retry.max_delay_secs.is_nan() || retry.max_delay_secs < retry.initial_delay_secs {
            return Err(ConfigError::invalid(
                "retry.max_delay_secs",
                "must not be below initial_delay_secs",
            ));
        }
        config.retry = retry;
    }
    if let Some(raw_server) = parsed.image_server {
        let mut server = ServerConfig::from(raw_server);
        if server.command.as_os_str().is_empty() {
            return Err(ConfigError::invalid("image_server.command", "must not be empty"));
        }
        if server.timeout.is_zero() {
            return Err(ConfigError::invalid("image_server.timeout_secs", "must be at least 1"));
        }
        for (key, value) in server_env(&config.credentials) {
            server.env.entry(key).or_insert(value);
        }
        config.image_server = server;
    }

    Ok(config)
}

fn non_empty(field: &str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}
