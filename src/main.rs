//! Bug Cascade entry point

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bug_cascade::cli::{self, chat, Cli, Command};
use bug_cascade::server;
use bug_cascade::state::AppState;
use bug_cascade_tools::StdioPrompt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Chat keeps logs quiet so they do not interleave with the conversation.
    let default_filter = match cli.command {
        Some(Command::Serve(_)) => "info",
        _ => "warn",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let service = cli.load_config()?;

    match &cli.command {
        None | Some(Command::Chat) => {
            let prompt = Arc::new(StdioPrompt::stdio());
            chat::run(service.into_config(), prompt).await?;
        }
        Some(Command::Serve(_)) => {
            let config = service.into_config();
            let bind = config.server.bind.clone();
            server::serve(AppState::from_config(config)?, &bind).await?;
        }
        Some(Command::Init(args)) => {
            let path = service.config_path().display().to_string();
            if cli::init_config(&service, args)? {
                println!("Wrote {}", path);
            } else {
                println!("{} already exists (use --force to overwrite)", path);
            }
        }
    }

    Ok(())
}
