//! Sources of human approval decisions.

use crate::approval::ApprovalRequest;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{debug, warn};

pub const APPROVAL_PROMPT: &str = "Would you like to approve of this order? (y/n)";

#[async_trait]
pub trait DecisionSource: Send {
    /// `true` approves the pending order.
    async fn decide(&mut self, request: &ApprovalRequest) -> std::io::Result<bool>;
}

/// Asks on a line-oriented terminal. `y` or `yes` approves, anything else
/// rejects.
pub struct LineDecision<R, W> {
    reader: R,
    prompt_out: W,
}

impl LineDecision<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineDecision<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

#[async_trait]
impl<R, W> DecisionSource for LineDecision<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn decide(&mut self, request: &ApprovalRequest) -> std::io::Result<bool> {
        self.prompt_out.write_all(APPROVAL_PROMPT.as_bytes()).await?;
        self.prompt_out.flush().await?;

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            warn!(
                approval = request.approval_id.as_str(),
                "Input closed before a decision, rejecting"
            );
            return Ok(false);
        }
        let approved = parse_decision(&line);
        debug!(approval = request.approval_id.as_str(), approved, "Decision read");
        Ok(approved)
    }
}

/// Answers every request the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub bool);

#[async_trait]
impl DecisionSource for FixedDecision {
    async fn decide(&mut self, _request: &ApprovalRequest) -> std::io::Result<bool> {
        Ok(self.0)
    }
}

pub fn parse_decision(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
