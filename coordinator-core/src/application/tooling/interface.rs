use async_trait::async_trait;
use serde_json::Value;

use super::error::ToolInvokeError;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// Access to the tools exposed by configured MCP servers.
#[async_trait]
pub trait ToolServerInterface: Send + Sync {
    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvokeError>;

    async fn list_tools(&self, server: &str) -> Result<Vec<ServerToolInfo>, ToolInvokeError>;
}
