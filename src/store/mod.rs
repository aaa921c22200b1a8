pub mod config;

use image::{DynamicImage, ImageError, ImageReader, ImageResult, Limits, RgbaImage};
use log::debug;
use regex::Regex;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::models::ManifestEntry;

const REGEX_UNSAFE: &str = r"[^A-Za-z0-9._-]";

/// Widest decoded pixel: four 32-bit float channels.
const MAX_BYTES_PER_PIXEL: u64 = 16;

/// Allocation guard that admits any image of up to `max_pixels` pixels,
/// whatever its channel layout and depth.
pub fn decode_limits(max_pixels: u64) -> Limits {
  let mut limits = Limits::default();
  limits.max_alloc = Some(max_pixels.saturating_mul(MAX_BYTES_PER_PIXEL));
  limits
}

pub fn decode_image(bytes: &[u8], limits: Limits) -> ImageResult<DynamicImage> {
  let mut reader = ImageReader::new(Cursor::new(bytes))
    .with_guessed_format()
    .map_err(ImageError::IoError)?;
  reader.limits(limits);
  reader.decode()
}

pub fn open_image(path: &Path, limits: Limits) -> ImageResult<DynamicImage> {
  let mut reader = ImageReader::open(path)
    .map_err(ImageError::IoError)?
    .with_guessed_format()
    .map_err(ImageError::IoError)?;
  reader.limits(limits);
  reader.decode()
}

/// Encode as an 8-bit RGBA PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, StoreError> {
  let mut data: Vec<u8> = Vec::with_capacity(image.as_raw().len() / 2);
  let mut encoder = png::Encoder::new(&mut data, image.width(), image.height());
  encoder.set_color(png::ColorType::Rgba);
  encoder.set_depth(png::BitDepth::Eight);
  let mut writer = encoder.write_header()?;
  writer.write_image_data(image.as_raw())?;
  writer.finish()?;
  Ok(data)
}

/// Replace the file at `path` with `image`. The PNG is written to a sibling
/// temporary file and renamed over `path`, so a failed write leaves the
/// previous file intact.
pub fn write_png(path: &Path, image: &RgbaImage) -> Result<(), StoreError> {
  let data = encode_png(image)?;
  debug!("Writing {} bytes to {:?}", data.len(), path);
  replace_file(path, &data)
}

fn replace_file(path: &Path, data: &[u8]) -> Result<(), StoreError> {
  let dir = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  let mut file = NamedTempFile::new_in(dir)?;
  file.write_all(data)?;
  file.as_file().sync_all()?;
  file.persist(path).map_err(|e| StoreError::Io(e.error))?;
  Ok(())
}

/// File name for a tile, with anything that could escape the output
/// directory replaced.
pub fn tile_file_name(id: &str) -> String {
  static UNSAFE: OnceLock<Regex> = OnceLock::new();
  let re = UNSAFE.get_or_init(|| Regex::new(REGEX_UNSAFE).expect("static pattern"));
  format!("{}.png", re.replace_all(id, "_"))
}

/// `name` joined to `dir`, provided it is a single plain file name.
pub fn contained_path(dir: &Path, name: &str) -> Option<PathBuf> {
  let mut components = Path::new(name).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(file)), None) => Some(dir.join(file)),
    _ => None,
  }
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<(), StoreError> {
  let mut writer = csv::Writer::from_path(path)?;
  for entry in entries {
    writer.serialize(entry)?;
  }
  writer.flush()?;
  Ok(())
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, StoreError> {
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(b',')
    .from_path(path)?;
  let mut entries = Vec::new();
  for result in reader.deserialize() {
    let entry: ManifestEntry = result?;
    entries.push(entry);
  }
  Ok(entries)
}
