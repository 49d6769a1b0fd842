use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

fn main() -> anyhow::Result<()> {
    // stdout carries command output only
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("balance_scan=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Schema => commands::schema::run(),
        cli::Command::Plan { file } => commands::plan::run(&file),
        cli::Command::Fetch {
            file,
            evm_holder,
            sealevel_holder,
            compact,
        } => commands::fetch::run(&commands::fetch::FetchConfig {
            file,
            evm_holder,
            sealevel_holder,
            compact,
        }),
    }
}
