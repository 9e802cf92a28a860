//! Model infrastructure module
//!
//! # Structure
//! - `types` - Request, Response, Error types
//! - `traits` - ModelProvider trait
//! - `retry` - backoff wrapper for transient HTTP failures
//! - `clients` - Gemini client implementation

pub mod clients;
pub mod retry;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use clients::GeminiClient;
pub use retry::RetryingProvider;
pub use traits::ModelProvider;
pub use types::{FunctionDeclaration, ModelError, ModelRequest, ModelResponse};
