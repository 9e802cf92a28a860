pub mod app;
pub mod error;
pub mod loader;
pub mod retry;
pub mod server;

pub use crate::constants::CONFIG_PATH;
pub use app::{AppConfig, Credentials};
pub use error::ConfigError;
pub use loader::{credentials_from_env, ensure_env_loaded};
pub use retry::RetryConfig;
pub use server::ServerConfig;
