//! Tools the agent can call: the local order tool and MCP-backed tools.

use super::context::ToolContext;
use super::errors::ToolError;
use crate::application::tooling::{ServerToolInfo, ToolInvokeError, ToolServerInterface};
use crate::config::ServerConfig;
use crate::model::FunctionDeclaration;
use crate::order::OrderPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn declaration(&self) -> FunctionDeclaration;

    async fn run(&self, args: Value, context: &mut ToolContext) -> Result<Value, ToolError>;
}

pub const CREATE_IMAGE_ORDER: &str = "create_image_order";

/// Function tool wrapping [`OrderPolicy`].
pub struct CreateImageOrderTool {
    policy: OrderPolicy,
}

#[derive(Debug, Deserialize)]
struct OrderArgs {
    num_images: u32,
    prompt: String,
}

impl CreateImageOrderTool {
    pub fn new(policy: OrderPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for CreateImageOrderTool {
    fn name(&self) -> &str {
        CREATE_IMAGE_ORDER
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: CREATE_IMAGE_ORDER.to_string(),
            description: format!(
                "Create an order for a number of images of one prompt. Orders above {} image(s) need human approval.",
                self.policy.threshold()
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "num_images": {
                        "type": "integer",
                        "description": "How many images to generate."
                    },
                    "prompt": {
                        "type": "string",
                        "description": "Text prompt describing the image."
                    }
                },
                "required": ["num_images", "prompt"]
            }),
        }
    }

    async fn run(&self, args: Value, context: &mut ToolContext) -> Result<Value, ToolError> {
        let args: OrderArgs = serde_json::from_value(args)
            .map_err(|err| ToolError::invalid_arguments(CREATE_IMAGE_ORDER, err.to_string()))?;
        if args.num_images == 0 {
            return Err(ToolError::invalid_arguments(
                CREATE_IMAGE_ORDER,
                "num_images must be a positive integer",
            ));
        }

        let order = self.policy.decide(args.num_images, &args.prompt, context);
        info!(
            num_images = args.num_images,
            status = ?order.status,
            order_id = order.order_id.as_deref(),
            "Image order decided"
        );
        Ok(order.to_value())
    }
}

/// A tool served by an MCP stdio server.
pub struct McpTool {
    server: String,
    info: ServerToolInfo,
    bridge: Arc<dyn ToolServerInterface>,
}

impl McpTool {
    pub fn new(
        server: impl Into<String>,
        info: ServerToolInfo,
        bridge: Arc<dyn ToolServerInterface>,
    ) -> Self {
        Self {
            server: server.into(),
            info,
            bridge,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.info.name.clone(),
            description: self.info.description.clone().unwrap_or_default(),
            parameters: self
                .info
                .input_schema
                .clone()
                .map(clean_schema)
                .unwrap_or_else(|| json!({ "type": "object", "properties": {} })),
        }
    }

    async fn run(&self, args: Value, _context: &mut ToolContext) -> Result<Value, ToolError> {
        debug!(server = self.server.as_str(), tool = self.info.name.as_str(), "Calling MCP tool");
        self.bridge
            .invoke_tool(&self.server, &self.info.name, args)
            .await
            .map_err(|source| ToolError::Execution {
                tool: self.info.name.clone(),
                source,
            })
    }
}

/// Build one [`McpTool`] per tool the server exposes through its filter.
pub async fn mcp_tools(
    server: &ServerConfig,
    bridge: Arc<dyn ToolServerInterface>,
) -> Result<Vec<Arc<dyn Tool>>, ToolInvokeError> {
    let listed = bridge.list_tools(&server.name).await?;
    let tools = listed
        .into_iter()
        .filter(|info| server.allows(&info.name))
        .map(|info| {
            Arc::new(McpTool::new(server.name.clone(), info, bridge.clone())) as Arc<dyn Tool>
        })
        .collect::<Vec<_>>();
    info!(
        server = server.name.as_str(),
        count = tools.len(),
        "Loaded MCP tools"
    );
    Ok(tools)
}

/// Strip JSON-schema keywords Gemini function declarations reject.
fn clean_schema(schema: Value) -> Value {
    const UNSUPPORTED: [&str; 4] = ["$schema", "additionalProperties", "title", "default"];
    match schema {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !UNSUPPORTED.contains(&key.as_str()))
                .map(|(key, value)| {
                    // Property names may collide with keywords, keep them.
                    if key == "properties" {
                        let cleaned = match value {
                            Value::Object(props) => Value::Object(
                                props
                                    .into_iter()
                                    .map(|(name, prop)| (name, clean_schema(prop)))
                                    .collect(),
                            ),
                            other => other,
                        };
                        (key, cleaned)
                    } else {
                        (key, clean_schema(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_schema).collect()),
        other => other,
    }
}
