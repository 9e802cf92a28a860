// Approval detector tests - marker detection over mixed event streams

use coordinator_core::approval::{ApprovalRequest, confirmation_reply, find_pending, text_parts};
use coordinator_core::constants::REQUEST_CONFIRMATION;
use coordinator_core::types::{Content, Event, FunctionCall, FunctionResponse, Part, Role};
use serde_json::json;

fn event(invocation: &str, parts: Vec<Part>) -> Event {
    Event::new(invocation, "image_agent", Some(Content::new(Role::Model, parts)))
}

fn function_call(id: &str, name: &str) -> Part {
    Part::FunctionCall(FunctionCall {
        id: id.into(),
        name: name.into(),
        args: json!({}),
    })
}

#[test]
fn ignores_streams_without_marker() {
    let events = vec![
        event("e-1", vec![Part::text("Creating your order.")]),
        event("e-1", vec![function_call("call-1", "create_image_order")]),
        event(
            "e-1",
            vec![Part::FunctionResponse(FunctionResponse {
                id: "call-1".into(),
                name: REQUEST_CONFIRMATION.into(),
                response: json!({"confirmed": true}),
            })],
        ),
        Event::new("e-1", "image_agent", None),
        event("e-1", vec![Part::Other]),
    ];
    assert_eq!(find_pending(&events), None);
}

#[test]
fn captures_ids_from_the_owning_event() {
    let events = vec![
        event("e-1", vec![Part::text("Checking.")]),
        event(
            "e-2",
            vec![
                function_call("call-7", "create_image_order"),
                function_call("confirm-7", REQUEST_CONFIRMATION),
            ],
        ),
    ];
    assert_eq!(
        find_pending(&events),
        Some(ApprovalRequest {
            approval_id: "confirm-7".into(),
            invocation_id: "e-2".into(),
        })
    );
}

#[test]
fn reply_round_trips_the_approval_id() {
    let request = ApprovalRequest {
        approval_id: "confirm-3".into(),
        invocation_id: "e-3".into(),
    };
    let reply = confirmation_reply(&request, false);

    assert_eq!(reply.role, Role::User);
    assert_eq!(reply.parts.len(), 1);
    match &reply.parts[0] {
        Part::FunctionResponse(response) => {
            assert_eq!(response.id, "confirm-3");
            assert_eq!(response.name, REQUEST_CONFIRMATION);
            assert_eq!(response.response, json!({"confirmed": false}));
        }
        other => panic!("unexpected part {other:?}"),
    }
}

#[test]
fn text_parts_skip_non_text() {
    let events = vec![
        event("e-1", vec![Part::text("one"), function_call("c", "x")]),
        Event::new("e-1", "image_agent", None),
        event("e-1", vec![Part::Other, Part::text("two")]),
    ];
    assert_eq!(text_parts(&events).collect::<Vec<_>>(), vec!["one", "two"]);
}
