//! MCP stdio tool servers: process lifecycle, JSON-RPC framing and the
//! registry that shares one process per configured server.

mod error;
mod interface;
mod manager;
mod process;

pub use error::ToolInvokeError;
pub use interface::{ServerToolInfo, ToolServerInterface};
pub use manager::ServerManager;
