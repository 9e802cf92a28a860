//! # Image Coordinator Core
//!
//! Approval-gated image ordering on top of a small resumable agent runtime.
//!
//! A user query goes to an LLM agent that owns two kinds of tools: the local
//! `create_image_order` function tool, which asks for human confirmation on
//! bulk orders, and the image generation tool of an MCP stdio server. When the
//! agent pauses for confirmation the [`workflow::Workflow`] collects a decision
//! and resumes the same invocation.

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, approval, decision, session, tooling, workflow};
pub use config::{AppConfig, ConfigError};
pub use domain::{order, types};
pub use infrastructure::model;
