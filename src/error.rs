use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A listing request or a raw byte fetch failed.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
  #[error("request failed: {0}")]
  Http(String),

  #[error("HTTP {status} from {url}")]
  Status { status: u16, url: String },

  #[error("invalid listing response: {0}")]
  Decode(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("i/o error: {0}")]
  Io(#[from] io::Error),

  #[error("png encoding failed: {0}")]
  Encode(#[from] png::EncodingError),

  #[error("manifest error: {0}")]
  Manifest(#[from] csv::Error),
}

/// A single avatar could not be fetched, decoded or persisted.
#[derive(Debug, Error)]
pub enum DownloadError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error("undecodable image: {0}")]
  Image(#[from] image::ImageError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
  #[error("no tiles to compose")]
  EmptyInput,

  #[error("grid needs at least one column")]
  ZeroColumns,

  #[error("{count} tiles of {tile_side}px in {columns} columns exceed the canvas size limit")]
  TooLarge { count: u32, columns: u32, tile_side: u32 },
}

#[derive(Debug, Error)]
pub enum OverwriteError {
  #[error("composite not found at {}", .0.display())]
  NotFound(PathBuf),

  #[error("failed to load {}: {source}", .path.display())]
  Load {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },

  #[error("composite of {width}x{height} does not split into {columns} square columns")]
  InvalidComposite { width: u32, height: u32, columns: u32 },

  #[error(transparent)]
  Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unable to read config: {0}")]
  Io(#[from] io::Error),

  #[error("unable to parse config: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("invalid setting: {0}")]
  Invalid(String),
}
