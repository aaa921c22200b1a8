use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::store::config::Settings;

pub mod fetch;
pub mod merge;
pub mod overwrite;

#[derive(Subcommand)]
pub enum SubCommand {
  /// Download avatars and merge them into one grid image
  Fetch(fetch::FetchCommand),
  /// Rebuild the grid image from previously downloaded avatars
  Merge(merge::MergeCommand),
  /// Replace the last grid slot with a picture of your own
  Overwrite(overwrite::OverwriteCommand),
}

/// Returns false when the command failed.
pub fn run_command(sub: SubCommand) -> bool {
  match sub {
    SubCommand::Fetch(cmd) => cmd.execute(),
    SubCommand::Merge(cmd) => cmd.execute(),
    SubCommand::Overwrite(cmd) => cmd.execute(),
  }
}

/// Settings flags shared by every command. Flags win over the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct SettingsArgs {
  /// YAML settings file
  #[clap(long, parse(from_os_str))]
  config: Option<PathBuf>,

  /// Side each avatar is resized to
  #[clap(long)]
  tile_side: Option<u32>,

  /// Avatars per grid row
  #[clap(long)]
  columns: Option<u32>,

  /// Avatars requested per listing call
  #[clap(long)]
  batch_size: Option<u32>,

  /// Number of listing calls
  #[clap(long)]
  batch_count: Option<u32>,

  /// Directory holding avatars and the merged image
  #[clap(long, parse(from_os_str))]
  output_dir: Option<PathBuf>,
}

impl SettingsArgs {
  pub fn resolve(&self) -> Result<Settings, ConfigError> {
    let mut settings = Settings::load(self.config.as_deref())?;
    if let Some(v) = self.tile_side { settings.tile_side = v; }
    if let Some(v) = self.columns { settings.columns = v; }
    if let Some(v) = self.batch_size { settings.batch_size = v; }
    if let Some(v) = self.batch_count { settings.batch_count = v; }
    if let Some(v) = &self.output_dir { settings.output_dir = v.clone(); }
    settings.validate()?;
    Ok(settings)
  }
}
