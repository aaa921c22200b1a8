use clap::Parser;
use log::{error, info, warn};
use std::fs::create_dir_all;
use tokio::runtime::Runtime;

use crate::client::{self, HttpClient, ReqwestClient};
use crate::commands::SettingsArgs;
use crate::error::ComposeError;
use crate::grid;
use crate::store::{self, config::Settings};

#[derive(Parser)]
pub struct FetchCommand {
  #[clap(flatten)]
  settings: SettingsArgs,
}

impl FetchCommand {
  pub fn execute(&self) -> bool {
    let settings = match self.settings.resolve() {
      Ok(s) => s,
      Err(err) => {
        error!("{}", err);
        return false;
      }
    };
    let client = match ReqwestClient::new(settings.timeout_secs) {
      Ok(c) => c,
      Err(err) => {
        error!("{}", err);
        return false;
      }
    };
    let rt = match Runtime::new() {
      Ok(rt) => rt,
      Err(err) => {
        error!("unable to start runtime: {}", err);
        return false;
      }
    };
    rt.block_on(run(&client, &settings))
  }
}

/// Download every batch, then write the manifest and the merged grid.
pub async fn run<C: HttpClient>(client: &C, settings: &Settings) -> bool {
  if let Err(err) = create_dir_all(&settings.output_dir) {
    error!("unable to create {:?}: {}", settings.output_dir, err);
    return false;
  }

  let harvest = client::download_all(client, settings).await;

  if !harvest.is_empty() {
    if let Err(err) = store::write_manifest(&settings.manifest_path(), &harvest.entries) {
      warn!("unable to write manifest: {}", err);
    }
  }

  info!("Merging {} avatars into a single image", harvest.len());
  let ok = match grid::compose(&harvest.tiles, settings.columns) {
    Ok(composite) => {
      let path = settings.composite_path();
      match store::write_png(&path, &composite) {
        Ok(()) => {
          info!("Merged image saved to {:?} ({}x{})", path, composite.width(), composite.height());
          true
        }
        Err(err) => {
          error!("unable to save merged image: {}", err);
          false
        }
      }
    }
    Err(ComposeError::EmptyInput) => {
      warn!("No avatars downloaded, nothing to merge");
      true
    }
    Err(err) => {
      error!("{}", err);
      false
    }
  };

  info!(
    "Download complete! Successfully downloaded {} avatars to {:?}",
    harvest.len(), settings.output_dir
  );
  ok
}
