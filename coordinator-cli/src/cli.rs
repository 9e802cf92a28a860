use clap::Parser;
use coordinator_core::constants::SAMPLE_QUERY;

#[derive(Parser, Debug)]
#[command(
    name = "coordinator",
    version,
    about = "Image generation agent with human approval for bulk orders"
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    pub config: Option<String>,
    /// Approve bulk orders without prompting
    #[arg(long, conflicts_with = "reject")]
    pub approve: bool,
    /// Reject bulk orders without prompting
    #[arg(long)]
    pub reject: bool,
    /// Override the Gemini API endpoint
    #[arg(long)]
    pub endpoint: Option<String>,
    pub query: Vec<String>,
}

impl Cli {
    pub fn query(&self) -> String {
        let joined = self.query.join(" ");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            SAMPLE_QUERY.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// The decision given on the command line, if any.
    pub fn fixed_decision(&self) -> Option<bool> {
        match (self.approve, self.reject) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
