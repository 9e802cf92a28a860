//! Model traits

use super::types::{ModelError, ModelRequest, ModelResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for model provider implementations
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Run one generation step
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}

#[async_trait]
impl<P: ModelProvider + ?Sized> ModelProvider for Arc<P> {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<P: ModelProvider + ?Sized> ModelProvider for Box<P> {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        (**self).generate(request).await
    }
}
