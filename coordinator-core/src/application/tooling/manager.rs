use super::error::ToolInvokeError;
use super::interface::{ServerToolInfo, ToolServerInterface};
use super::process::McpProcess;
use crate::config::ServerConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Lazily started, process-wide MCP servers keyed by name.
pub struct ServerManager {
    configs: HashMap<String, ServerConfig>,
    instances: Mutex<HashMap<String, Arc<McpProcess>>>,
}

impl ServerManager {
    pub fn new(configs: Vec<ServerConfig>) -> Self {
        let configs = configs
            .into_iter()
            .map(|cfg| (cfg.name.clone(), cfg))
            .collect();
        Self {
            configs,
            instances: Mutex::new(HashMap::new()),
        }
    }

    fn process(&self, server: &str) -> Result<Arc<McpProcess>, ToolInvokeError> {
        let not_configured = || ToolInvokeError::NotConfigured {
            server: server.to_string(),
        };
        let config = self.configs.get(server).ok_or_else(not_configured)?;

        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let process = instances
            .entry(server.to_string())
            .or_insert_with(|| {
                debug!(server, "Registering MCP server process");
                Arc::new(McpProcess::new(config.clone()))
            })
            .clone();
        Ok(process)
    }
}

#[async_trait]
impl ToolServerInterface for ServerManager {
    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvokeError> {
        let process = self.process(server)?;
        process.call_tool(tool, arguments).await
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        let process = self.process(server)?;
        process.tools().await
    }
}
