use clap::Parser;
use ragctx_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    Cli::parse().run().await
}
