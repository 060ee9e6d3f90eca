use std::path::PathBuf;

use branchtag_core::config::TaggerConfig;
use branchtag_core::models::region::Region;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write ~/.branchtag/config.toml with defaults
    Init,
    /// Show the effective configuration
    Show {
        /// Read this file instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List known regions and their API URLs
    Regions,
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = TaggerConfig::init()?;
            println!("Initialized config at {}", path.display());
            Ok(())
        }
        ConfigAction::Show { config } => {
            let config = match config {
                Some(path) => TaggerConfig::load_from(&path)?,
                None => TaggerConfig::load()?,
            };
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{toml_str}");
            Ok(())
        }
        ConfigAction::Regions => {
            for region in Region::all() {
                println!("{:<12} {}", region, region.base_url());
            }
            Ok(())
        }
    }
}
