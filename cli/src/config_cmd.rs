use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use ragctx_pipeline::PipelineConfig;

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Validate without printing the configuration
    #[arg(long)]
    pub check: bool,
}

pub(crate) fn run_config(args: ConfigArgs, config: &PipelineConfig) -> Result<()> {
    config.validate()?;

    if args.check {
        println!("{} Configuration is valid", "✓".bright_green());
        return Ok(());
    }

    print!("{}", config.to_toml_string()?);
    Ok(())
}
