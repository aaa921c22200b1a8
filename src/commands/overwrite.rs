use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};

use crate::commands::SettingsArgs;
use crate::error::OverwriteError;
use crate::grid::{self, Slot};
use crate::store::{self, config::Settings};

#[derive(Parser)]
pub struct OverwriteCommand {
  /// Picture to put in the last grid slot
  #[clap(required = true, parse(from_os_str))]
  picture: PathBuf,

  #[clap(flatten)]
  settings: SettingsArgs,
}

impl OverwriteCommand {
  pub fn execute(&self) -> bool {
    let settings = match self.settings.resolve() {
      Ok(s) => s,
      Err(err) => {
        error!("{}", err);
        return false;
      }
    };
    match replace_last_avatar(&settings, &self.picture) {
      Ok(slot) => {
        info!(
          "Successfully replaced the last avatar with your picture at position ({}, {})",
          slot.row, slot.col
        );
        true
      }
      Err(err) => {
        error!("Error adding your picture: {}", err);
        false
      }
    }
  }
}

/// Overwrite the last slot of the saved composite with `picture` and resave
/// it. Nothing is written unless every step before the save succeeds.
///
/// Two concurrent runs against the same composite race; the last save wins.
pub fn replace_last_avatar(settings: &Settings, picture: &Path) -> Result<Slot, OverwriteError> {
  let path = settings.composite_path();
  if !path.exists() {
    return Err(OverwriteError::NotFound(path));
  }
  let limits = settings.decode_limits();
  let mut composite = store::open_image(&path, limits.clone())
    .map_err(|source| OverwriteError::Load { path: path.clone(), source })?
    .to_rgba8();

  info!("Loading your image from: {:?}", picture);
  let replacement = store::open_image(picture, limits)
    .map_err(|source| OverwriteError::Load { path: picture.to_path_buf(), source })?;

  let slot = grid::overwrite_last_slot(&mut composite, &replacement, settings.columns)?;
  store::write_png(&path, &composite)?;
  Ok(slot)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgba, RgbaImage};

  fn settings(dir: &Path) -> Settings {
    Settings {
      columns: 3,
      output_dir: dir.to_path_buf(),
      ..Settings::default()
    }
  }

  #[test]
  fn missing_composite_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = replace_last_avatar(&settings(dir.path()), &dir.path().join("me.png"));
    assert!(matches!(result, Err(OverwriteError::NotFound(_))));
  }

  #[test]
  fn undecodable_picture_leaves_composite_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let original = RgbaImage::from_pixel(6, 4, Rgba([5, 5, 5, 255]));
    store::write_png(&settings.composite_path(), &original).unwrap();
    let picture = dir.path().join("me.jpg");
    std::fs::write(&picture, b"definitely not a jpeg").unwrap();

    let result = replace_last_avatar(&settings, &picture);
    assert!(matches!(result, Err(OverwriteError::Load { .. })));
    let reread = store::open_image(&settings.composite_path(), settings.decode_limits())
      .unwrap()
      .to_rgba8();
    assert_eq!(reread, original);
  }

  #[test]
  fn replaces_last_slot_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    store::write_png(&settings.composite_path(), &RgbaImage::new(6, 4)).unwrap();
    let picture = dir.path().join("me.png");
    store::write_png(&picture, &RgbaImage::from_pixel(10, 10, Rgba([200, 100, 50, 255]))).unwrap();

    let slot = replace_last_avatar(&settings, &picture).unwrap();
    assert_eq!((slot.index, slot.row, slot.col), (5, 1, 2));
    let again = replace_last_avatar(&settings, &picture).unwrap();
    assert_eq!(again, slot);

    let reread = store::open_image(&settings.composite_path(), settings.decode_limits())
      .unwrap()
      .to_rgba8();
    assert_eq!(reread.get_pixel(5, 3).0, [200, 100, 50, 255]);
    assert_eq!(reread.get_pixel(4, 2).0, [200, 100, 50, 255]);
    assert_eq!(reread.get_pixel(3, 3).0, [0, 0, 0, 0]);
  }
}
