//! ProdMind CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use prodmind::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { force } => prodmind::cli::commands::init::execute(force).await,
        Commands::Config => prodmind::cli::commands::config::execute(),
        Commands::Session(command) => prodmind::cli::commands::session::execute(command).await,
        Commands::Debate(command) => prodmind::cli::commands::debate::execute(command).await,
    };

    if let Err(err) = result {
        prodmind::cli::handle_error(&err);
    }
}
