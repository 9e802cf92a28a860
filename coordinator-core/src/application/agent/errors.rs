use crate::application::session::SessionError;
use crate::application::tooling::ToolInvokeError;
use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invocation '{invocation_id}' is not waiting for a confirmation")]
    UnknownInvocation { invocation_id: String },
    #[error("resume of invocation '{invocation_id}' carries no confirmation response")]
    MissingConfirmation { invocation_id: String },
    #[error("confirmation response '{found}' does not match pending request '{expected}'")]
    ConfirmationMismatch { expected: String, found: String },
    #[error("confirmation response '{id}' has no boolean 'confirmed' field")]
    InvalidConfirmation { id: String },
    #[error("agent exceeded the limit of {limit} model calls in one invocation")]
    MaxLlmCalls { limit: u32 },
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::MaxLlmCalls { .. } => {
                "The agent did not finish within its step budget. Try a simpler request.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("failed to execute tool '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl ToolError {
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}
