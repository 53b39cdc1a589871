mod cli;

use clap::Parser;
use cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("neurocalm=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    cli::run(args).await
}
