use crate::order::{ConfirmationContext, ToolConfirmation};
use serde_json::Value;

/// Per-call context handed to a tool by the runner.
#[derive(Debug, Clone)]
pub struct ToolContext {
    confirmation: Option<ToolConfirmation>,
    requested: Option<ToolConfirmation>,
}

impl ToolContext {
    pub fn new(confirmation: Option<ToolConfirmation>) -> Self {
        Self {
            confirmation,
            requested: None,
        }
    }

    /// The confirmation request registered during the call, if any.
    pub fn requested_confirmation(&self) -> Option<&ToolConfirmation> {
        self.requested.as_ref()
    }

    pub(crate) fn take_requested(&mut self) -> Option<ToolConfirmation> {
        self.requested.take()
    }
}

impl ConfirmationContext for ToolContext {
    fn tool_confirmation(&self) -> Option<&ToolConfirmation> {
        self.confirmation.as_ref()
    }

    fn request_confirmation(&mut self, hint: String, payload: Value) {
        self.requested = Some(ToolConfirmation {
            hint,
            confirmed: false,
            payload,
        });
    }
}
