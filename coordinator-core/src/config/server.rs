use crate::constants::{
    DEFAULT_IMAGE_SERVER_COMMAND, DEFAULT_IMAGE_SERVER_NAME, DEFAULT_IMAGE_TOOL,
    DEFAULT_TOOL_TIMEOUT_SECS,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Launch parameters of an MCP stdio server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
    pub timeout: Duration,
    /// Only these tools are exposed to the agent; empty means all of them.
    pub tool_filter: Vec<String>,
}

impl ServerConfig {
    pub fn allows(&self, tool: &str) -> bool {
        self.tool_filter.is_empty() || self.tool_filter.iter().any(|name| name == tool)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig::from(RawServer::default())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct RawServer {
    name: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    workdir: Option<String>,
    timeout_secs: u64,
    tool_filter: Vec<String>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            name: DEFAULT_IMAGE_SERVER_NAME.to_string(),
            command: DEFAULT_IMAGE_SERVER_COMMAND.to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            workdir: None,
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            tool_filter: vec![DEFAULT_IMAGE_TOOL.to_string()],
        }
    }
}

impl From<RawServer> for ServerConfig {
    fn from(raw: RawServer) -> Self {
        let expand = |s: &str| -> String {
            shellexpand::full(s)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };

        let command = PathBuf::from(expand(&raw.command));
        let workdir = raw.workdir.map(|d| PathBuf::from(expand(&d)));
        let args = raw.args.into_iter().map(|arg| expand(&arg)).collect();

        Self {
            name: raw.name,
            command,
            args,
            env: raw.env,
            workdir,
            timeout: Duration::from_secs(raw.timeout_secs),
            tool_filter: raw.tool_filter,
        }
    }
}
