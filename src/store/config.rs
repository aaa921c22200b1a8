use image::Limits;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_TILE_SIDE: u32 = 256;
pub const DEFAULT_COLUMNS: u32 = 10;
pub const DEFAULT_BATCH_SIZE: u32 = 50;
pub const DEFAULT_BATCH_COUNT: u32 = 5;
pub const DEFAULT_API_URL: &str = "https://tinyfac.es/api/data";
pub const DEFAULT_MAX_DECODE_PIXELS: u64 = 1_000_000_000;

/// Run settings, read from an optional YAML file. Missing keys keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Side every avatar is normalised to, in pixels.
  pub tile_side: u32,
  /// Grid width in tiles.
  pub columns: u32,
  /// Records requested per listing call.
  pub batch_size: u32,
  /// Number of listing calls.
  pub batch_count: u32,
  pub api_url: String,
  pub quality: u32,
  pub output_dir: PathBuf,
  pub composite_name: String,
  pub manifest_name: String,
  /// Largest image, in pixels, the decoder may allocate for.
  pub max_decode_pixels: u64,
  pub timeout_secs: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Settings {
      tile_side: DEFAULT_TILE_SIDE,
      columns: DEFAULT_COLUMNS,
      batch_size: DEFAULT_BATCH_SIZE,
      batch_count: DEFAULT_BATCH_COUNT,
      api_url: String::from(DEFAULT_API_URL),
      quality: 0,
      output_dir: PathBuf::from("avatars"),
      composite_name: String::from("merged_avatars.png"),
      manifest_name: String::from("manifest.csv"),
      max_decode_pixels: DEFAULT_MAX_DECODE_PIXELS,
      timeout_secs: 30,
    }
  }
}

impl Settings {
  pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
      Some(p) => Settings::from_yaml(&read_to_string(p)?),
      None => Ok(Settings::default()),
    }
  }

  pub fn from_yaml(source: &str) -> Result<Settings, ConfigError> {
    Ok(serde_yaml::from_str(source)?)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.tile_side == 0 {
      return Err(ConfigError::Invalid("tile_side must be positive".into()));
    }
    if self.columns == 0 {
      return Err(ConfigError::Invalid("columns must be positive".into()));
    }
    if self.batch_size == 0 {
      return Err(ConfigError::Invalid("batch_size must be positive".into()));
    }
    if self.columns.checked_mul(self.tile_side).is_none() {
      return Err(ConfigError::Invalid(format!(
        "{} columns of {}px exceed the maximum image width",
        self.columns, self.tile_side
      )));
    }
    Ok(())
  }

  pub fn listing_url(&self) -> String {
    format!("{}?limit={}&quality={}", self.api_url, self.batch_size, self.quality)
  }

  pub fn composite_path(&self) -> PathBuf {
    self.output_dir.join(&self.composite_name)
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.output_dir.join(&self.manifest_name)
  }

  /// File name for the tile of `id`. Names that would land on the
  /// composite or the manifest get a `tile_` prefix.
  pub fn tile_file_name(&self, id: &str) -> String {
    let name = super::tile_file_name(id);
    if name == self.composite_name || name == self.manifest_name {
      format!("tile_{}", name)
    } else {
      name
    }
  }

  pub fn tile_path(&self, id: &str) -> PathBuf {
    self.output_dir.join(self.tile_file_name(id))
  }

  pub fn decode_limits(&self) -> Limits {
    super::decode_limits(self.max_decode_pixels)
  }
}
