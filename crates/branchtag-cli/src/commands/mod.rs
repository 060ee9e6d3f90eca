pub mod config;
pub mod summary;
pub mod tag;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Initialize and inspect configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
    /// Tag projects that scan their repository's default branch
    Tag(tag::TagArgs),
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Config { action } => config::run(action),
        Command::Tag(args) => tag::run(args).await,
    }
}
