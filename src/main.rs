use anyhow::Result;
use clap::Parser;
use siamese_patch::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("siamese_patch=info".parse()?),
        )
        .init();

    Cli::parse().run()
}
