// Workflow scenario tests - full runs through the real runner
//
// The model is a deterministic stand-in that follows the agent instruction:
// order first, generate one image per approved image, then report.

use async_trait::async_trait;
use coordinator_core::agent::{Agent, CreateImageOrderTool, Runner, Tool, mcp_tools};
use coordinator_core::approval::ApprovalRequest;
use coordinator_core::config::ServerConfig;
use coordinator_core::decision::{DecisionSource, FixedDecision, LineDecision};
use coordinator_core::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use coordinator_core::order::OrderPolicy;
use coordinator_core::session::{InMemorySessionService, SessionKey};
use coordinator_core::tooling::{ServerToolInfo, ToolInvokeError, ToolServerInterface};
use coordinator_core::types::{Content, FunctionCall, Part, Role};
use coordinator_core::workflow::{
    CoordinatorContext, Workflow, WorkflowError, WorkflowReport, WorkflowSettings,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

const IMAGE_TOOL: &str = "generate_image_from_text";

#[derive(Clone, Default)]
struct RecordingBridge {
    prompts: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl ToolServerInterface for RecordingBridge {
    async fn invoke_tool(
        &self,
        _server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvokeError> {
        assert_eq!(tool, IMAGE_TOOL);
        let mut prompts = self.prompts.lock().await;
        prompts.push(arguments);
        Ok(json!({ "saved": format!("/tmp/images/{}.png", prompts.len()) }))
    }

    async fn list_tools(&self, _server: &str) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        Ok(vec![
            ServerToolInfo {
                name: IMAGE_TOOL.into(),
                description: Some("Generate an image from a prompt.".into()),
                input_schema: Some(json!({
                    "type": "object",
                    "properties": {"prompt": {"type": "string"}},
                    "required": ["prompt"]
                })),
            },
            ServerToolInfo {
                name: "transform_image".into(),
                description: None,
                input_schema: None,
            },
        ])
    }
}

#[derive(Clone, Default)]
struct InstructedModel {
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl InstructedModel {
    fn respond(request: &ModelRequest) -> Content {
        let last = request.contents.last().expect("history is never empty");
        let order = last
            .function_responses()
            .find(|response| response.name == "create_image_order")
            .map(|response| response.response.clone());

        if let Some(order) = order {
            return match order["status"].as_str() {
                Some("approved") => {
                    let count = order["num_images"].as_u64().unwrap_or(0);
                    let calls = (0..count)
                        .map(|_| {
                            Part::FunctionCall(FunctionCall {
                                id: String::new(),
                                name: IMAGE_TOOL.into(),
                                args: json!({ "prompt": order["prompt"] }),
                            })
                        })
                        .collect();
                    Content::new(Role::Model, calls)
                }
                _ => say(&format!("{} No images were generated.", order["message"].as_str().unwrap_or(""))),
            };
        }

        if last.function_responses().any(|response| response.name == IMAGE_TOOL) {
            let order_id = request
                .contents
                .iter()
                .flat_map(|content| content.function_responses())
                .filter(|response| response.name == "create_image_order")
                .filter_map(|response| response.response["order_id"].as_str())
                .last()
                .unwrap_or("unknown")
                .to_string();
            let images = last.function_responses().count();
            return say(&format!("Order {order_id} complete: {images} image(s) generated."));
        }

        // One order per number in the query.
        let query = last.parts.iter().find_map(Part::as_text).unwrap_or("");
        let mut counts: Vec<u32> = query
            .split_whitespace()
            .filter_map(|word| word.parse().ok())
            .collect();
        if counts.is_empty() {
            counts.push(1);
        }
        let orders = counts
            .into_iter()
            .map(|count| {
                Part::FunctionCall(FunctionCall {
                    id: String::new(),
                    name: "create_image_order".into(),
                    args: json!({ "num_images": count, "prompt": "a striped hand puppet" }),
                })
            })
            .collect();
        Content::new(Role::Model, orders)
    }
}

fn say(text: &str) -> Content {
    Content::new(Role::Model, vec![Part::text(text)])
}

#[async_trait]
impl ModelProvider for InstructedModel {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let content = Self::respond(&request);
        self.requests.lock().await.push(request);
        Ok(ModelResponse::new(content))
    }
}

struct Harness {
    workflow: Workflow,
    sessions: Arc<InMemorySessionService>,
    model: InstructedModel,
    bridge: RecordingBridge,
}

async fn harness() -> Harness {
    let model = InstructedModel::default();
    let bridge = RecordingBridge::default();
    let sessions = Arc::new(InMemorySessionService::new());

    let mut tools: Vec<Arc<dyn Tool>> =
        vec![Arc::new(CreateImageOrderTool::new(OrderPolicy::default()))];
    tools.extend(
        mcp_tools(&ServerConfig::default(), Arc::new(bridge.clone()))
            .await
            .expect("tools listed"),
    );
    let agent = Agent {
        name: "image_agent".into(),
        model: "gemini-test".into(),
        instruction: "coordinate image orders".into(),
        tools,
        max_llm_calls: 20,
    };
    let runner = Runner::new("image_coordinator", agent, model.clone(), sessions.clone());

    let workflow = Workflow::new(CoordinatorContext {
        sessions: sessions.clone(),
        runtime: Arc::new(runner),
        settings: WorkflowSettings {
            app_name: "image_coordinator".into(),
            user_id: "test_user".into(),
        },
    });
    Harness {
        workflow,
        sessions,
        model,
        bridge,
    }
}

struct Unreachable;

#[async_trait]
impl DecisionSource for Unreachable {
    async fn decide(&mut self, _request: &ApprovalRequest) -> std::io::Result<bool> {
        panic!("the human must not be asked");
    }
}

async fn run(
    harness: &Harness,
    query: &str,
    decisions: &mut dyn DecisionSource,
) -> (WorkflowReport, String) {
    let mut out = Vec::new();
    let report = harness
        .workflow
        .run(query, decisions, &mut out)
        .await
        .expect("workflow completes");
    (report, String::from_utf8(out).expect("utf8 output"))
}

#[tokio::test]
async fn single_image_runs_without_prompt() {
    let harness = harness().await;
    let (report, printed) = run(&harness, "Create 1 image of a puppet", &mut Unreachable).await;

    assert_eq!(report.invocations, 1);
    assert!(report.decision.is_none());
    assert_eq!(
        report.transcript,
        vec!["Order ORD-1-AUTO complete: 1 image(s) generated."]
    );
    assert!(printed.contains("Agent > Order ORD-1-AUTO complete"));
    assert!(!printed.contains("Pausing"));
    assert_eq!(harness.bridge.prompts.lock().await.len(), 1);
}

#[tokio::test]
async fn approved_bulk_order_resumes_same_invocation() {
    let harness = harness().await;
    let mut human = LineDecision::new(&b"y\n"[..], tokio::io::sink());
    let (report, printed) = run(&harness, "Create 5 images of a puppet", &mut human).await;

    assert_eq!(report.invocations, 2);
    let decision = report.decision.expect("decision taken");
    assert!(decision.approved);
    assert!(decision.request.approval_id.starts_with("confirm-"));
    assert_eq!(
        report.transcript,
        vec!["Order ORD-5-HUMAN complete: 5 image(s) generated."]
    );
    assert!(printed.contains("Human Decision: APPROVE"));
    assert_eq!(harness.bridge.prompts.lock().await.len(), 5);

    let requests = harness.model.requests.lock().await;
    for request in requests.iter() {
        assert!(request.tools.iter().any(|tool| tool.name == "create_image_order"));
        assert!(request.tools.iter().any(|tool| tool.name == IMAGE_TOOL));
        assert!(request.tools.iter().all(|tool| tool.name != "transform_image"));
    }
}

#[tokio::test]
async fn rejected_bulk_order_generates_nothing() {
    let harness = harness().await;
    let mut human = LineDecision::new(&b"n\n"[..], tokio::io::sink());
    let (report, printed) = run(&harness, "Create 5 images of a puppet", &mut human).await;

    assert_eq!(report.invocations, 2);
    assert!(!report.decision.expect("decision taken").approved);
    assert_eq!(
        report.transcript,
        vec!["Order rejected: 5 images of a striped hand puppet No images were generated."]
    );
    assert!(printed.contains("Human Decision: REJECT"));
    assert!(harness.bridge.prompts.lock().await.is_empty());
}

#[tokio::test]
async fn concurrent_runs_use_separate_sessions() {
    let harness = harness().await;
    let workflow = &harness.workflow;

    let first = async {
        let mut out = Vec::new();
        workflow.run("Create 1 image", &mut Unreachable, &mut out).await
    };
    let second = async {
        let mut out = Vec::new();
        let mut human = LineDecision::new(&b"yes\n"[..], tokio::io::sink());
        workflow.run("Create 3 images", &mut human, &mut out).await
    };
    let (first, second) = futures::join!(first, second);
    let (first, second) = (first.expect("first run"), second.expect("second run"));

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(first.invocations, 1);
    assert_eq!(second.invocations, 2);
    assert_eq!(harness.bridge.prompts.lock().await.len(), 4);
}

#[tokio::test]
async fn two_bulk_orders_in_one_turn_fail_after_the_first_decision() {
    let harness = harness().await;
    let mut out = Vec::new();
    let err = harness
        .workflow
        .run("Create 5 and 3 images", &mut FixedDecision(true), &mut out)
        .await
        .unwrap_err();

    match err {
        WorkflowError::UnresolvedApproval {
            invocation_id,
            approval_id,
        } => {
            assert!(invocation_id.starts_with("e-"));
            assert!(approval_id.starts_with("confirm-"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(harness.bridge.prompts.lock().await.is_empty());
    assert_eq!(harness.model.requests.lock().await.len(), 1);

    let printed = String::from_utf8(out).expect("utf8 output");
    assert_eq!(printed.matches("Pausing for approval").count(), 1);
    assert!(printed.contains("Human Decision: APPROVE"));
}

#[tokio::test]
async fn sessions_do_not_outlive_their_run() {
    let harness = harness().await;
    let (report, _) = run(&harness, "Create 3 images", &mut FixedDecision(true)).await;

    let key = SessionKey::new("image_coordinator", "test_user", report.session_id);
    assert!(harness.sessions.get_session(&key).await.is_none());
}
