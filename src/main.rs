use clap::Parser;
use farecast::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("farecast=info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli)?;
    Ok(())
}
