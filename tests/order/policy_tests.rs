// Order policy tests - approval outcomes across image counts and decisions

use coordinator_core::order::{
    ConfirmationContext, OrderPolicy, OrderStatus, ToolConfirmation,
};
use serde_json::{Value, json};

#[derive(Default)]
struct Context {
    confirmation: Option<ToolConfirmation>,
    requests: Vec<(String, Value)>,
}

impl Context {
    fn decided(confirmed: bool) -> Self {
        Self {
            confirmation: Some(ToolConfirmation {
                hint: String::new(),
                confirmed,
                payload: Value::Null,
            }),
            requests: Vec::new(),
        }
    }
}

impl ConfirmationContext for Context {
    fn tool_confirmation(&self) -> Option<&ToolConfirmation> {
        self.confirmation.as_ref()
    }

    fn request_confirmation(&mut self, hint: String, payload: Value) {
        self.requests.push((hint, payload));
    }
}

#[test]
fn single_image_is_auto_approved_whatever_the_context() {
    let policy = OrderPolicy::default();
    for mut ctx in [Context::default(), Context::decided(false), Context::decided(true)] {
        let order = policy.decide(1, "a kite", &mut ctx);
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(order.order_id.as_deref(), Some("ORD-1-AUTO"));
        assert!(ctx.requests.is_empty());
    }
}

#[test]
fn bulk_orders_request_confirmation_once() {
    let policy = OrderPolicy::default();
    for count in [2, 5, 40] {
        let mut ctx = Context::default();
        let order = policy.decide(count, "a kite", &mut ctx);

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.order_id, None);
        assert_eq!(
            order.message,
            format!("Order for {count} images requires approval")
        );
        assert_eq!(ctx.requests.len(), 1);
        let (hint, payload) = &ctx.requests[0];
        assert_eq!(
            hint,
            &format!("Large order: {count} images. Do you want to approve?")
        );
        assert_eq!(payload, &json!({ "num_images": count }));
    }
}

#[test]
fn human_decision_settles_bulk_orders() {
    let policy = OrderPolicy::default();

    let approved = policy.decide(5, "a kite", &mut Context::decided(true));
    assert_eq!(approved.status, OrderStatus::Approved);
    assert_eq!(approved.order_id.as_deref(), Some("ORD-5-HUMAN"));
    assert_eq!(approved.message, "Order approved: 5 images of a kite");

    let rejected = policy.decide(5, "a kite", &mut Context::decided(false));
    assert_eq!(rejected.status, OrderStatus::Rejected);
    assert_eq!(rejected.order_id, None);
    assert_eq!(rejected.message, "Order rejected: 5 images of a kite");
}

#[test]
fn order_serializes_for_the_model() {
    let mut ctx = Context::default();
    let pending = OrderPolicy::default().decide(3, "a kite", &mut ctx).to_value();
    assert_eq!(
        pending,
        json!({
            "status": "pending",
            "num_images": 3,
            "prompt": "a kite",
            "message": "Order for 3 images requires approval"
        })
    );
}

#[test]
fn raised_threshold_auto_approves_more() {
    let policy = OrderPolicy::new(4);
    let mut ctx = Context::default();
    let order = policy.decide(4, "a kite", &mut ctx);
    assert_eq!(order.order_id.as_deref(), Some("ORD-4-AUTO"));
    assert!(ctx.requests.is_empty());
}
