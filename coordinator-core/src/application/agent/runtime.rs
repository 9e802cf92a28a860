use super::errors::AgentError;
use crate::types::{Content, Event, FunctionCall, FunctionResponse};
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

/// Events of one turn, in production order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, AgentError>> + Send>>;

/// One message submitted to the runtime.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub session_id: String,
    pub message: Content,
    /// Set to continue a paused invocation instead of starting a new turn.
    pub invocation_id: Option<String>,
}

impl TurnRequest {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        message: Content,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            message,
            invocation_id: None,
        }
    }

    pub fn resuming(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = Some(invocation_id.into());
        self
    }
}

/// Boundary between the workflow and whatever runs the agent.
pub trait AgentRuntime: Send + Sync {
    fn submit(&self, request: TurnRequest) -> EventStream;
}

/// State kept while an invocation waits for a human decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PausedInvocation {
    pub invocation_id: String,
    pub confirmation_call_id: String,
    pub original_call: FunctionCall,
    pub hint: String,
    pub payload: Value,
    /// Calls of the same model turn that had not run yet.
    pub remaining_calls: Vec<FunctionCall>,
    /// Responses of the same model turn that already completed.
    pub completed: Vec<FunctionResponse>,
}
