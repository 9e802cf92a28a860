//! Image order approval policy.
//!
//! Small orders are approved on the spot. Anything above the bulk threshold
//! needs a human decision: the first call registers a confirmation request
//! with the calling context and reports the order as pending, and the call
//! replayed after the decision approves or rejects it.

use crate::constants::DEFAULT_BULK_THRESHOLD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Approved,
    Pending,
    Rejected,
}

/// Outcome of one `create_image_order` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub num_images: u32,
    pub prompt: String,
    pub message: String,
}

impl Order {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "status": "error" }))
    }
}

/// Decision supplied by a human for a paused tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfirmation {
    #[serde(default)]
    pub hint: String,
    pub confirmed: bool,
    #[serde(default)]
    pub payload: Value,
}

/// The slice of a tool invocation context the policy needs.
pub trait ConfirmationContext {
    /// Decision attached to a resumed call, if any.
    fn tool_confirmation(&self) -> Option<&ToolConfirmation>;

    /// Register a request for an external decision; the runtime pauses the
    /// invocation once the current tool returns.
    fn request_confirmation(&mut self, hint: String, payload: Value);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPolicy {
    threshold: u32,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BULK_THRESHOLD)
    }
}

impl OrderPolicy {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn decide(
        &self,
        num_images: u32,
        prompt: &str,
        context: &mut dyn ConfirmationContext,
    ) -> Order {
        if num_images <= self.threshold {
            return Order {
                status: OrderStatus::Approved,
                order_id: Some(format!("ORD-{num_images}-AUTO")),
                num_images,
                prompt: prompt.to_string(),
                message: format!("Order auto-approved: {num_images} images"),
            };
        }

        let confirmed = match context.tool_confirmation() {
            Some(confirmation) => confirmation.confirmed,
            None => {
                context.request_confirmation(
                    format!("Large order: {num_images} images. Do you want to approve?"),
                    json!({ "num_images": num_images }),
                );
                return Order {
                    status: OrderStatus::Pending,
                    order_id: None,
                    num_images,
                    prompt: prompt.to_string(),
                    message: format!("Order for {num_images} images requires approval"),
                };
            }
        };

        if confirmed {
            Order {
                status: OrderStatus::Approved,
                order_id: Some(format!("ORD-{num_images}-HUMAN")),
                num_images,
                prompt: prompt.to_string(),
                message: format!("Order approved: {num_images} images of {prompt}"),
            }
        } else {
            Order {
                status: OrderStatus::Rejected,
                order_id: None,
                num_images,
                prompt: prompt.to_string(),
                message: format!("Order rejected: {num_images} images of {prompt}"),
            }
        }
    }
}
