mod cli;
mod config;
mod error;
mod fetch;
mod parser;
mod update;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;
use update::PatchService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Config::from_env(cli.document.clone())?;
    info!(
        document = %config.document_path.display(),
        output = ?cli.output,
        base_url = %config.base_url,
        match_mode = ?cli.match_mode,
        "configuration loaded"
    );

    let service = PatchService::new(config, cli.output.clone(), cli.match_mode.matcher(), None);
    let result = service.run(cli.command.into_patch()).await.inspect_err(|e| {
        tracing::error!(error = %e, "patch failed");
    })?;

    match result.written_to {
        Some(path) => info!(path = %path.display(), changed = result.changed, "done"),
        None => info!("done, nothing written"),
    }
    Ok(())
}
