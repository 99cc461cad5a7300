mod cli;
mod command;
mod config;
mod error;

use clap::CommandFactory;
use clap::Parser;
use error::WrapErr;
use tracing_subscriber::EnvFilter;

// NOTE, if built using MUSL, it's probably necessary to change to use a different
// allocator just like what ripgrep does: https://github.com/BurntSushi/ripgrep/blob/0a88cccd5188074de96f54a4b6b44a63971ac157/crates/core/main.rs#L40

#[tokio::main]
async fn main() -> error::Result<()> {
    color_eyre::install()?;
    let command_line = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(command_line.log_level())),
        )
        .init();

    let Some(command) = command_line.command else {
        cli::Cli::command().print_help()?;
        return Ok(());
    };

    let cfg = config::Config::load(command_line.config.as_deref())
        .context("Load configuration error")?;
    let cmd: Box<dyn command::Command> = match command {
        cli::Commands::Serve => Box::new(command::ServeCommand::new(cfg)),
        cli::Commands::Rebuild { site } => Box::new(command::RebuildCommand::new(cfg, site)),
        cli::Commands::Status => Box::new(command::StatusCommand::new(cfg)),
        cli::Commands::ResetSubscription { id } => {
            Box::new(command::ResetSubscriptionCommand::new(cfg, id))
        }
    };
    cmd.execute().await
}
