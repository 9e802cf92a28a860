//! One user query from submission to completion, with at most one human
//! approval checkpoint in between.

use crate::agent::{AgentError, AgentRuntime, EventStream, TurnRequest};
use crate::approval::{ApprovalRequest, confirmation_reply, find_pending, text_parts};
use crate::config::AppConfig;
use crate::decision::DecisionSource;
use crate::session::{InMemorySessionService, SessionError, SessionKey};
use crate::types::{Content, Event};
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to read approval decision: {0}")]
    Decision(#[source] std::io::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
    #[error(
        "invocation '{invocation_id}' asked for another approval ('{approval_id}') after the decision"
    )]
    UnresolvedApproval {
        invocation_id: String,
        approval_id: String,
    },
}

impl WorkflowError {
    /// Short explanation suitable for the person at the terminal.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Agent(err) => err.user_message(),
            WorkflowError::UnresolvedApproval { .. } => {
                "The agent asked for a second approval in the same request. \
                 Submit each bulk order separately."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub app_name: String,
    pub user_id: String,
}

impl From<&AppConfig> for WorkflowSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            user_id: config.user_id.clone(),
        }
    }
}

/// Everything a workflow run needs, passed explicitly.
#[derive(Clone)]
pub struct CoordinatorContext {
    pub sessions: Arc<InMemorySessionService>,
    pub runtime: Arc<dyn AgentRuntime>,
    pub settings: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub request: ApprovalRequest,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub session_id: String,
    /// Runtime submissions performed: 1, or 2 when a decision was needed.
    pub invocations: u32,
    pub decision: Option<Decision>,
    /// Agent text lines in the order they were printed.
    pub transcript: Vec<String>,
}

pub struct Workflow {
    context: CoordinatorContext,
}

impl Workflow {
    pub fn new(context: CoordinatorContext) -> Self {
        Self { context }
    }

    pub async fn run(
        &self,
        query: &str,
        decisions: &mut dyn DecisionSource,
        out: &mut (dyn Write + Send),
    ) -> Result<WorkflowReport, WorkflowError> {
        let settings = &self.context.settings;
        let key = SessionKey::new(
            settings.app_name.clone(),
            settings.user_id.clone(),
            new_session_id(),
        );
        self.context.sessions.create_session(key.clone()).await?;
        info!(session = key.session_id.as_str(), "Workflow started");

        let outcome = self.drive(&key, query, decisions, out).await;
        self.context.sessions.delete_session(&key).await;
        outcome
    }

    async fn drive(
        &self,
        key: &SessionKey,
        query: &str,
        decisions: &mut dyn DecisionSource,
        out: &mut (dyn Write + Send),
    ) -> Result<WorkflowReport, WorkflowError> {
        let settings = &self.context.settings;
        let session_id = &key.session_id;

        writeln!(out, "\n{}", "=".repeat(RULE_WIDTH))?;
        writeln!(out, "User > {query}\n")?;

        let mut report = WorkflowReport {
            session_id: session_id.clone(),
            invocations: 1,
            decision: None,
            transcript: Vec::new(),
        };

        let request = TurnRequest::new(
            settings.user_id.clone(),
            session_id.clone(),
            Content::user_text(query),
        );
        let events = collect(self.context.runtime.submit(request)).await?;

        match find_pending(&events) {
            None => {
                for text in text_parts(&events) {
                    print_agent(out, &mut report.transcript, text)?;
                }
            }
            Some(pending) => {
                info!(
                    session = session_id.as_str(),
                    invocation = pending.invocation_id.as_str(),
                    approval = pending.approval_id.as_str(),
                    "Invocation paused for approval"
                );
                writeln!(out, "⏸️  Pausing for approval...")?;
                out.flush()?;
                let approved = decisions
                    .decide(&pending)
                    .await
                    .map_err(WorkflowError::Decision)?;
                writeln!(
                    out,
                    "🤔 Human Decision: {}\n",
                    if approved { "APPROVE ✅" } else { "REJECT ❌" }
                )?;

                let resume = TurnRequest::new(
                    settings.user_id.clone(),
                    session_id.clone(),
                    confirmation_reply(&pending, approved),
                )
                .resuming(pending.invocation_id.clone());
                report.invocations += 1;

                let mut stream = self.context.runtime.submit(resume);
                while let Some(event) = stream.next().await {
                    let event = event?;
                    let event = std::slice::from_ref(&event);
                    for text in text_parts(event) {
                        print_agent(out, &mut report.transcript, text)?;
                    }
                    if let Some(again) = find_pending(event) {
                        warn!(
                            session = session_id.as_str(),
                            invocation = again.invocation_id.as_str(),
                            approval = again.approval_id.as_str(),
                            "Resumed invocation paused again"
                        );
                        return Err(WorkflowError::UnresolvedApproval {
                            invocation_id: again.invocation_id,
                            approval_id: again.approval_id,
                        });
                    }
                }
                report.decision = Some(Decision {
                    request: pending,
                    approved,
                });
            }
        }

        writeln!(out, "{}\n", "=".repeat(RULE_WIDTH))?;
        info!(
            session = session_id.as_str(),
            invocations = report.invocations,
            "Workflow completed"
        );
        Ok(report)
    }
}

async fn collect(mut stream: EventStream) -> Result<Vec<Event>, AgentError> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event?);
    }
    Ok(events)
}

fn print_agent(
    out: &mut (dyn Write + Send),
    transcript: &mut Vec<String>,
    text: &str,
) -> std::io::Result<()> {
    writeln!(out, "Agent > {text}")?;
    transcript.push(text.to_string());
    Ok(())
}

fn new_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("order_{}", &hex[..8])
}
