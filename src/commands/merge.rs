use clap::Parser;
use log::{error, info, warn};

use crate::commands::SettingsArgs;
use crate::error::ComposeError;
use crate::grid;
use crate::models::Tile;
use crate::store::{self, config::Settings};

#[derive(Parser)]
pub struct MergeCommand {
  #[clap(flatten)]
  settings: SettingsArgs,
}

impl MergeCommand {
  pub fn execute(&self) -> bool {
    match self.settings.resolve() {
      Ok(settings) => merge(&settings),
      Err(err) => {
        error!("{}", err);
        false
      }
    }
  }
}

/// Rebuild the composite from the tiles listed in the manifest, keeping
/// download order.
pub fn merge(settings: &Settings) -> bool {
  let manifest = settings.manifest_path();
  let entries = match store::read_manifest(&manifest) {
    Ok(e) => e,
    Err(err) => {
      error!("unable to read manifest {:?}: {}", manifest, err);
      return false;
    }
  };

  let limits = settings.decode_limits();
  let mut tiles = Vec::with_capacity(entries.len());
  for entry in entries.iter() {
    let path = match store::contained_path(&settings.output_dir, &entry.file) {
      Some(p) => p,
      None => {
        warn!("skipping avatar {}: {:?} is outside {:?}", entry.index, entry.file, settings.output_dir);
        continue;
      }
    };
    match store::open_image(&path, limits.clone()) {
      Ok(image) => tiles.push(Tile::from_image(&entry.id, &image, settings.tile_side)),
      Err(err) => warn!("skipping avatar {} ({:?}): {}", entry.index, path, err),
    }
  }

  let composite = match grid::compose(&tiles, settings.columns) {
    Ok(c) => c,
    Err(ComposeError::EmptyInput) => {
      warn!("No avatars found in {:?}, nothing to merge", manifest);
      return false;
    }
    Err(err) => {
      error!("{}", err);
      return false;
    }
  };

  let path = settings.composite_path();
  match store::write_png(&path, &composite) {
    Ok(()) => {
      info!("Merged {} avatars into {:?}", tiles.len(), path);
      true
    }
    Err(err) => {
      error!("unable to save merged image: {}", err);
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ManifestEntry;
  use image::{Rgba, RgbaImage};

  #[test]
  fn rebuilds_in_manifest_order_and_skips_missing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
      tile_side: 2,
      columns: 2,
      output_dir: dir.path().to_path_buf(),
      ..Settings::default()
    };
    store::write_png(&settings.tile_path("b"), &RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]))).unwrap();
    store::write_png(&settings.tile_path("a"), &RgbaImage::from_pixel(6, 6, Rgba([255, 0, 0, 255]))).unwrap();
    let entries = vec![
      ManifestEntry { index: 0, id: "b".into(), url: "u".into(), file: "b.png".into() },
      ManifestEntry { index: 1, id: "gone".into(), url: "u".into(), file: "gone.png".into() },
      ManifestEntry { index: 2, id: "a".into(), url: "u".into(), file: "a.png".into() },
    ];
    store::write_manifest(&settings.manifest_path(), &entries).unwrap();

    assert!(merge(&settings));
    let composite = store::open_image(&settings.composite_path(), settings.decode_limits())
      .unwrap()
      .to_rgba8();
    assert_eq!(composite.dimensions(), (4, 2));
    assert_eq!(composite.get_pixel(0, 0).0, [0, 0, 255, 255]);
    assert_eq!(composite.get_pixel(3, 1).0, [255, 0, 0, 255]);
  }

  #[test]
  fn entries_outside_output_dir_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let settings = Settings {
      tile_side: 2,
      columns: 2,
      output_dir: root.path().join("avatars"),
      ..Settings::default()
    };
    std::fs::create_dir(&settings.output_dir).unwrap();
    store::write_png(&root.path().join("x.png"), &RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]))).unwrap();
    store::write_png(&settings.tile_path("ok"), &RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]))).unwrap();
    let entries = vec![
      ManifestEntry { index: 0, id: "x".into(), url: "u".into(), file: "../x.png".into() },
      ManifestEntry { index: 1, id: "ok".into(), url: "u".into(), file: "ok.png".into() },
    ];
    store::write_manifest(&settings.manifest_path(), &entries).unwrap();

    assert!(merge(&settings));
    let composite = store::open_image(&settings.composite_path(), settings.decode_limits())
      .unwrap()
      .to_rgba8();
    assert_eq!(composite.dimensions(), (4, 2));
    assert_eq!(composite.get_pixel(0, 0).0, [0, 255, 0, 255]);
    assert_eq!(composite.get_pixel(2, 0).0, [0, 0, 0, 0]);
  }

  #[test]
  fn missing_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings { output_dir: dir.path().to_path_buf(), ..Settings::default() };
    assert!(!merge(&settings));
    assert!(!settings.composite_path().exists());
  }
}
