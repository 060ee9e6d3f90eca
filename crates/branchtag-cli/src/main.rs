mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "branchtag",
    version,
    about = "Tag scan-platform projects that track their repository's default branch"
)]
struct Cli {
    /// Log request-level detail
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    commands::run(cli.command).await
}
