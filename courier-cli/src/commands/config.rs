use crate::config::{ConfigLoader, CourierConfig};
use anyhow::{Result, bail};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
    /// Write a default user configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
        ConfigCommands::Init { force } => init_config(force),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    println!("User config:    {:?}", ConfigLoader::user_config_path());
    println!("Project config: {:?}", ConfigLoader::project_config_path());
    println!("Credentials:    {:?}", courier_paths::sessions_dir());
    Ok(())
}

fn init_config(force: bool) -> Result<()> {
    let Some(path) = ConfigLoader::user_config_path() else {
        bail!("could not determine the user config directory");
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ConfigLoader::save_to_path(&CourierConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
