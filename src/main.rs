use anyhow::Context;
use clap::Parser;
use refgraph::Settings;
use refgraph::cli::{Cli, CommandContext};
use refgraph::io::{Envelope, ResultCode};
use refgraph::logging;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Settings::load().context("Failed to load configuration")?,
    };
    logging::init_with_config(&settings.logging);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("[main] interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    let context = CommandContext::new(settings, cli.facts);
    let envelope = match refgraph::cli::run(cli.command, &context, &cancel).await {
        Ok(envelope) => envelope,
        Err(e) => Envelope::error(ResultCode::InternalError, format!("{e:#}")),
    };

    let output = if cli.compact {
        envelope.to_json_compact()?
    } else {
        envelope.to_json()?
    };
    println!("{output}");

    std::process::exit(i32::from(envelope.exit_code));
}
