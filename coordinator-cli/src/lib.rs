mod cli;

pub use cli::Cli;

use coordinator_core::agent::Runner;
use coordinator_core::config::AppConfig;
use coordinator_core::decision::{DecisionSource, FixedDecision, LineDecision};
use coordinator_core::session::InMemorySessionService;
use coordinator_core::tooling::ServerManager;
use coordinator_core::workflow::{CoordinatorContext, Workflow, WorkflowSettings};
use std::error::Error;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting image coordinator");
    debug!(config = ?cli.config, endpoint = ?cli.endpoint, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or defaults");
    }
    if let Some(endpoint) = &cli.endpoint {
        info!(endpoint = endpoint.as_str(), "Overriding Gemini endpoint based on CLI flag");
        config.endpoint = endpoint.clone();
    }

    let sessions = Arc::new(InMemorySessionService::new());
    let servers = Arc::new(ServerManager::new(vec![config.image_server.clone()]));
    let runner = Runner::from_config(&config, sessions.clone(), servers).await?;

    let workflow = Workflow::new(CoordinatorContext {
        sessions,
        runtime: Arc::new(runner),
        settings: WorkflowSettings::from(&config),
    });

    let query = cli.query();
    let mut decisions: Box<dyn DecisionSource> = match cli.fixed_decision() {
        Some(approved) => {
            info!(approved, "Using decision from command line");
            Box::new(FixedDecision(approved))
        }
        None => Box::new(LineDecision::stdio()),
    };
    let mut stdout = std::io::stdout();
    let report = match workflow.run(&query, decisions.as_mut(), &mut stdout).await {
        Ok(report) => report,
        Err(error) => {
            error!(%error, "Coordinator run failed");
            writeln!(stdout, "❌ {}", error.user_message())?;
            return Err(error.into());
        }
    };

    info!(
        session = report.session_id.as_str(),
        invocations = report.invocations,
        approved = ?report.decision.as_ref().map(|decision| decision.approved),
        "Coordinator run finished"
    );
    Ok(())
}

/// Logs go to stderr; stdout carries the conversation.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
