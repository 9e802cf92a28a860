use super::context::ToolContext;
use super::errors::AgentError;
use super::runtime::{AgentRuntime, EventStream, PausedInvocation, TurnRequest};
use super::tools::{CreateImageOrderTool, Tool, mcp_tools};
use crate::application::session::{InMemorySessionService, SessionKey};
use crate::application::tooling::{ToolInvokeError, ToolServerInterface};
use crate::config::AppConfig;
use crate::constants::REQUEST_CONFIRMATION;
use crate::model::{GeminiClient, ModelProvider, ModelRequest, RetryingProvider};
use crate::order::{OrderPolicy, ToolConfirmation};
use crate::types::{Content, Event, FunctionCall, FunctionResponse, Part, Role};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Static definition of the LLM agent.
pub struct Agent {
    pub name: String,
    pub model: String,
    pub instruction: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub max_llm_calls: u32,
}

impl Agent {
    fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }
}

/// Resumable agent runtime: runs model/tool steps for a turn and pauses
/// invocations whose tools ask for confirmation.
pub struct Runner<P> {
    inner: Arc<RunnerInner<P>>,
}

impl<P> Clone for Runner<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct RunnerInner<P> {
    app_name: String,
    agent: Agent,
    model: P,
    sessions: Arc<InMemorySessionService>,
}

impl<P: ModelProvider + 'static> Runner<P> {
    pub fn new(
        app_name: impl Into<String>,
        agent: Agent,
        model: P,
        sessions: Arc<InMemorySessionService>,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                app_name: app_name.into(),
                agent,
                model,
                sessions,
            }),
        }
    }

    pub fn sessions(&self) -> &Arc<InMemorySessionService> {
        &self.inner.sessions
    }
}

impl Runner<RetryingProvider<GeminiClient>> {
    /// Wire the Gemini-backed image agent: the order tool first, then the
    /// image server's tools as listed by `bridge`.
    pub async fn from_config(
        config: &AppConfig,
        sessions: Arc<InMemorySessionService>,
        bridge: Arc<dyn ToolServerInterface>,
    ) -> Result<Self, ToolInvokeError> {
        let mut tools: Vec<Arc<dyn Tool>> = vec![Arc::new(CreateImageOrderTool::new(
            OrderPolicy::new(config.bulk_threshold),
        ))];
        tools.extend(mcp_tools(&config.image_server, bridge).await?);

        let agent = Agent {
            name: config.agent_name.clone(),
            model: config.model.clone(),
            instruction: config.instruction.clone(),
            tools,
            max_llm_calls: config.max_llm_calls,
        };
        let model = RetryingProvider::new(GeminiClient::from_config(config), config.retry.clone());
        Ok(Self::new(config.app_name.clone(), agent, model, sessions))
    }
}

impl<P: ModelProvider + 'static> AgentRuntime for Runner<P> {
    fn submit(&self, request: TurnRequest) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let key = SessionKey::new(
                inner.app_name.clone(),
                request.user_id.clone(),
                request.session_id.clone(),
            );
            let invocation_id = request
                .invocation_id
                .clone()
                .unwrap_or_else(|| format!("e-{}", Uuid::new_v4()));
            let mut invocation = Invocation {
                inner: &inner,
                key,
                invocation_id,
                tx: tx.clone(),
                llm_calls: 0,
            };
            let outcome = match request.invocation_id {
                Some(_) => invocation.resume(request.message).await,
                None => invocation.start(request.message).await,
            };
            if let Err(err) = outcome {
                warn!(error = %err, "Agent invocation failed");
                let _ = tx.send(Err(err));
            }
        });
        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

enum Flow {
    Continue,
    Paused,
}

struct Invocation<'a, P> {
    inner: &'a RunnerInner<P>,
    key: SessionKey,
    invocation_id: String,
    tx: mpsc::UnboundedSender<Result<Event, AgentError>>,
    llm_calls: u32,
}

impl<P: ModelProvider> Invocation<'_, P> {
    async fn start(&mut self, message: Content) -> Result<(), AgentError> {
        info!(
            session = self.key.session_id.as_str(),
            invocation = self.invocation_id.as_str(),
            "Starting new turn"
        );
        self.emit("user", message).await?;
        self.agent_loop().await
    }

    async fn resume(&mut self, message: Content) -> Result<(), AgentError> {
        info!(
            session = self.key.session_id.as_str(),
            invocation = self.invocation_id.as_str(),
            "Resuming paused invocation"
        );
        let sessions = &self.inner.sessions;
        let paused = sessions
            .take_paused(&self.key, &self.invocation_id)
            .await?
            .ok_or_else(|| AgentError::UnknownInvocation {
                invocation_id: self.invocation_id.clone(),
            })?;

        let confirmed = match confirmation_decision(&message, &paused) {
            Ok(confirmed) => confirmed,
            Err(err) => {
                // The invocation stays resumable with a corrected reply.
                sessions.pause(&self.key, paused).await?;
                return Err(err);
            }
        };
        debug!(confirmed, call = paused.original_call.name.as_str(), "Applying decision");
        self.emit("user", message).await?;

        let confirmation = ToolConfirmation {
            hint: paused.hint,
            confirmed,
            payload: paused.payload,
        };
        let mut calls = vec![paused.original_call];
        calls.extend(paused.remaining_calls);

        match self
            .execute_calls(calls, paused.completed, Some(confirmation))
            .await?
        {
            Flow::Paused => Ok(()),
            Flow::Continue => self.agent_loop().await,
        }
    }

    async fn agent_loop(&mut self) -> Result<(), AgentError> {
        let inner = self.inner;
        let agent = &inner.agent;
        loop {
            if self.llm_calls >= agent.max_llm_calls {
                return Err(AgentError::MaxLlmCalls {
                    limit: agent.max_llm_calls,
                });
            }
            self.llm_calls += 1;

            let request = self.build_request().await?;
            debug!(
                invocation = self.invocation_id.as_str(),
                step = self.llm_calls,
                "Submitting agent step to model"
            );
            let response = inner.model.generate(request).await?;
            debug!(finish_reason = ?response.finish_reason, "Model step finished");
            let mut content = response.content;
            content.role = Role::Model;
            assign_call_ids(&mut content);

            let calls: Vec<FunctionCall> = content.function_calls().cloned().collect();
            self.emit(&agent.name, content).await?;
            if calls.is_empty() {
                info!(
                    invocation = self.invocation_id.as_str(),
                    steps = self.llm_calls,
                    "Agent turn complete"
                );
                return Ok(());
            }

            if let Flow::Paused = self.execute_calls(calls, Vec::new(), None).await? {
                return Ok(());
            }
        }
    }

    /// Run the calls of one model turn in order. Stops at the first call that
    /// asks for confirmation and stores the rest for the resume.
    async fn execute_calls(
        &mut self,
        calls: Vec<FunctionCall>,
        mut completed: Vec<FunctionResponse>,
        mut confirmation: Option<ToolConfirmation>,
    ) -> Result<Flow, AgentError> {
        let mut queue = calls.into_iter();
        while let Some(call) = queue.next() {
            let (response, requested) = self.call_tool(&call, confirmation.take()).await;
            if let Some(request) = requested {
                self.request_confirmation(call, request, response, queue.collect(), completed)
                    .await?;
                return Ok(Flow::Paused);
            }
            completed.push(response);
        }

        let parts = completed.into_iter().map(Part::FunctionResponse).collect();
        let author = self.inner.agent.name.clone();
        self.emit(&author, Content::new(Role::User, parts)).await?;
        Ok(Flow::Continue)
    }

    async fn call_tool(
        &self,
        call: &FunctionCall,
        confirmation: Option<ToolConfirmation>,
    ) -> (FunctionResponse, Option<ToolConfirmation>) {
        let mut context = ToolContext::new(confirmation);
        let response = match self.inner.agent.tool(&call.name) {
            Some(tool) => match tool.run(call.args.clone(), &mut context).await {
                Ok(value) => value,
                Err(err) => {
                    warn!(tool = call.name.as_str(), error = %err, "Tool call failed");
                    json!({ "error": err.to_string() })
                }
            },
            None => {
                warn!(tool = call.name.as_str(), "Model requested an unknown tool");
                json!({ "error": format!("unknown tool '{}'", call.name) })
            }
        };
        let response = FunctionResponse {
            id: call.id.clone(),
            name: call.name.clone(),
            response,
        };
        (response, context.take_requested())
    }

    async fn request_confirmation(
        &mut self,
        call: FunctionCall,
        request: ToolConfirmation,
        pending_result: FunctionResponse,
        remaining_calls: Vec<FunctionCall>,
        completed: Vec<FunctionResponse>,
    ) -> Result<(), AgentError> {
        let confirmation_call_id = format!("confirm-{}", Uuid::new_v4());
        info!(
            invocation = self.invocation_id.as_str(),
            tool = call.name.as_str(),
            confirmation = confirmation_call_id.as_str(),
            "Tool requested confirmation, pausing invocation"
        );

        let marker = FunctionCall {
            id: confirmation_call_id.clone(),
            name: REQUEST_CONFIRMATION.to_string(),
            args: json!({
                "originalFunctionCall": {
                    "id": call.id,
                    "name": call.name,
                    "args": call.args,
                },
                "toolConfirmation": {
                    "hint": request.hint,
                    "payload": request.payload,
                    "confirmed": false,
                },
                "pendingResult": pending_result.response,
            }),
        };

        // Paused state is stored before the marker is visible to the caller.
        self.inner
            .sessions
            .pause(
                &self.key,
                PausedInvocation {
                    invocation_id: self.invocation_id.clone(),
                    confirmation_call_id,
                    original_call: call,
                    hint: request.hint,
                    payload: request.payload,
                    remaining_calls,
                    completed,
                },
            )
            .await?;

        let author = self.inner.agent.name.clone();
        self.emit(&author, Content::new(Role::Model, vec![Part::FunctionCall(marker)]))
            .await
    }

    async fn build_request(&self) -> Result<ModelRequest, AgentError> {
        let session = self
            .inner
            .sessions
            .get_session(&self.key)
            .await
            .ok_or_else(|| crate::session::SessionError::NotFound {
                user_id: self.key.user_id.clone(),
                session_id: self.key.session_id.clone(),
            })?;

        let contents = session
            .events
            .iter()
            .filter_map(|event| event.content.as_ref())
            .filter_map(model_visible)
            .collect();
        let agent = &self.inner.agent;

        Ok(ModelRequest {
            model: agent.model.clone(),
            system_instruction: Some(agent.instruction.clone()),
            contents,
            tools: agent.tools.iter().map(|tool| tool.declaration()).collect(),
        })
    }

    async fn emit(&self, author: &str, content: Content) -> Result<(), AgentError> {
        let event = Event::new(self.invocation_id.clone(), author, Some(content));
        self.inner
            .sessions
            .append_event(&self.key, event.clone())
            .await?;
        if self.tx.send(Ok(event)).is_err() {
            debug!("Event consumer dropped; continuing turn");
        }
        Ok(())
    }
}

/// Extract the decision for the paused call from the resume message.
fn confirmation_decision(message: &Content, paused: &PausedInvocation) -> Result<bool, AgentError> {
    let mut responses = message
        .function_responses()
        .filter(|response| response.name == REQUEST_CONFIRMATION);
    let response = responses
        .next()
        .ok_or_else(|| AgentError::MissingConfirmation {
            invocation_id: paused.invocation_id.clone(),
        })?;
    if response.id != paused.confirmation_call_id {
        return Err(AgentError::ConfirmationMismatch {
            expected: paused.confirmation_call_id.clone(),
            found: response.id.clone(),
        });
    }
    response
        .response
        .get("confirmed")
        .and_then(Value::as_bool)
        .ok_or_else(|| AgentError::InvalidConfirmation {
            id: response.id.clone(),
        })
}

/// Confirmation traffic is between the runtime and the caller; the model
/// never sees it.
fn model_visible(content: &Content) -> Option<Content> {
    let parts: Vec<Part> = content
        .parts
        .iter()
        .filter(|part| match part {
            Part::FunctionCall(call) => call.name != REQUEST_CONFIRMATION,
            Part::FunctionResponse(response) => response.name != REQUEST_CONFIRMATION,
            Part::Text { .. } => true,
            Part::Other => false,
        })
        .cloned()
        .collect();
    (!parts.is_empty()).then(|| Content::new(content.role, parts))
}

fn assign_call_ids(content: &mut Content) {
    for part in &mut content.parts {
        if let Part::FunctionCall(call) = part {
            if call.id.is_empty() {
                call.id = format!("call-{}", Uuid::new_v4());
            }
        }
    }
}
