mod config_cmd;
mod query_cmd;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use ragctx_pipeline::PipelineConfig;
use std::path::Path;
use std::path::PathBuf;

pub use config_cmd::ConfigArgs;
pub use query_cmd::ModeArg;
pub use query_cmd::QueryArgs;

/// Assemble retrieval-augmented context from a document store
#[derive(Debug, Parser)]
#[command(name = "ragctx", version)]
pub struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Retrieve, rerank and optimize context for one or more queries
    Query(QueryArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        match self.command {
            Command::Query(args) => query_cmd::run_query(args, config).await,
            Command::Config(args) => config_cmd::run_config(args, &config),
        }
    }
}

/// Load the configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}
