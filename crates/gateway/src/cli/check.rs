//! `fineflow-guard check`: one guarded decision from the command line.

use anyhow::Context;

use ff_backend::create_backend;
use ff_domain::budget::{OperationRequest, ProjectId};
use ff_domain::config::Config;
use ff_guard::GuardRegistry;

/// Read the project's budget once and decide on `request`.
///
/// Returns `true` when the decision is `block`.
pub async fn run(config: &Config, project: &str, request: OperationRequest) -> anyhow::Result<bool> {
    let backend = create_backend(&config.backend).context("creating budget backend")?;
    let registry = GuardRegistry::new(backend, &config.guard).without_polling();

    let project = ProjectId::from(project);
    let guard = registry.get(&project);
    match guard.refresh().await {
        Ok(_) => {}
        Err(e) if e.is_transient() => {
            tracing::warn!(error = %e, "budget backend unreachable, applying fail policy");
        }
        Err(e) => return Err(e).with_context(|| format!("reading budget for {project}")),
    }

    let decision = guard.evaluate(&request);
    let output = serde_json::json!({
        "project_id": project,
        "summary": guard.summary(),
        "decision": decision,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(decision.is_blocked())
}
