//! Detection of paused invocations and construction of the decision reply.

use crate::constants::REQUEST_CONFIRMATION;
use crate::types::{Content, Event, FunctionResponse, Part, Role};
use serde_json::json;

/// Correlation identifiers of a pending confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    /// Id of the `request_confirmation` function call.
    pub approval_id: String,
    /// Invocation to resume with the decision.
    pub invocation_id: String,
}

/// First confirmation request in event order, if any.
pub fn find_pending(events: &[Event]) -> Option<ApprovalRequest> {
    events.iter().find_map(|event| {
        event.parts().iter().find_map(|part| match part {
            Part::FunctionCall(call) if call.name == REQUEST_CONFIRMATION => {
                Some(ApprovalRequest {
                    approval_id: call.id.clone(),
                    invocation_id: event.invocation_id.clone(),
                })
            }
            Part::FunctionCall(_) | Part::FunctionResponse(_) | Part::Text { .. } | Part::Other => {
                None
            }
        })
    })
}

/// The user turn carrying a decision for `request`.
pub fn confirmation_reply(request: &ApprovalRequest, confirmed: bool) -> Content {
    Content::new(
        Role::User,
        vec![Part::FunctionResponse(FunctionResponse {
            id: request.approval_id.clone(),
            name: REQUEST_CONFIRMATION.to_string(),
            response: json!({ "confirmed": confirmed }),
        })],
    )
}

pub fn text_parts(events: &[Event]) -> impl Iterator<Item = &str> {
    events
        .iter()
        .flat_map(|event| event.parts())
        .filter_map(Part::as_text)
}
