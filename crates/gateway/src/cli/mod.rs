pub mod check;
pub mod config;

use std::path::Path;

use clap::{Parser, Subcommand};

use ff_domain::config::Config;

/// FineFlow budget guard: enforces monthly AI spend budgets per project.
#[derive(Debug, Parser)]
#[command(name = "fineflow-guard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP API (default when no subcommand is given).
    Serve,
    /// Decide once whether an operation may run for a project.
    ///
    /// Prints the summary and decision as JSON; exits with code 2 when
    /// the decision is `block`.
    Check {
        /// Project identifier.
        project: String,
        /// Operation kind (evaluation, search, training, ...).
        #[arg(long, default_value = "ai_operation")]
        kind: String,
        /// Model the operation would use.
        #[arg(long)]
        model: Option<String>,
        /// Estimated cost of the operation in USD.
        #[arg(long)]
        estimate: Option<f64>,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `FF_CONFIG` (or `config.toml`
/// by default). Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("FF_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(Path::new(&config_path))?;
    Ok((config, config_path))
}

/// Parse `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))
}
