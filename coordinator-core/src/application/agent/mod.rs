//! # Agent Module
//!
//! A resumable LLM agent runtime with a human-in-the-loop confirmation
//! checkpoint.
//!
//! ## Key Types
//!
//! - [`Runner`] - Executes turns for an [`Agent`] and streams [`crate::types::Event`]s
//! - [`TurnRequest`] - A new message, or a confirmation reply for a paused invocation
//! - [`Tool`] - Function tools the agent can call
//! - [`ToolContext`] - Per-call context through which tools request confirmation
//!
//! ## Agent Loop
//!
//! 1. Send the session history to the model
//! 2. Run every function call of the model turn, in order
//! 3. If a tool requested confirmation, emit a `request_confirmation` call and pause
//! 4. Otherwise append the tool responses and go back to 1 until the model answers in text
//!
//! A paused invocation is resumed by submitting a [`TurnRequest`] carrying the
//! same invocation id and a `request_confirmation` function response.

mod context;
mod errors;
mod runner;
mod runtime;
mod tools;


pub use context::ToolContext;
pub use errors::{AgentError, ToolError};
pub use runner::{Agent, Runner};
pub use runtime::{AgentRuntime, EventStream, PausedInvocation, TurnRequest};
pub use tools::{CREATE_IMAGE_ORDER, CreateImageOrderTool, McpTool, Tool, mcp_tools};
