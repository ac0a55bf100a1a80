use clap::Parser;
use ldifber::config::{CliArgs, Command};
use ldifber::{commands, Config};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Settings feed the log level, so they are loaded first
    let config = Config::from_cli_args(args)?;

    // Commands write their output to stdout
    FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let summary = commands::run(&config).await?;

    if summary.errors > 0 {
        anyhow::bail!(
            "{} of {} records failed to parse",
            summary.errors,
            summary.records + summary.errors
        );
    }
    if matches!(config.command, Command::Validate { .. }) {
        eprintln!("{} records OK", summary.records);
    }

    Ok(())
}
