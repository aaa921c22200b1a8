use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageResult, Limits, RgbaImage};

use crate::store;

/// A decoded square avatar. All tiles handed to the compositor share `side`.
#[derive(Debug, Clone)]
pub struct Tile {
  pub id: String,
  pub image: RgbaImage,
}

impl Tile {
  pub fn from_bytes(id: &str, bytes: &[u8], side: u32, limits: Limits) -> ImageResult<Tile> {
    let decoded = store::decode_image(bytes, limits)?;
    Ok(Tile::from_image(id, &decoded, side))
  }

  pub fn from_image(id: &str, image: &DynamicImage, side: u32) -> Tile {
    Tile {
      id: id.to_string(),
      image: fit_square(image, side),
    }
  }

  pub fn side(&self) -> u32 {
    self.image.width()
  }
}

/// Stretch `image` to exactly `side`x`side`, ignoring its aspect ratio.
pub fn fit_square(image: &DynamicImage, side: u32) -> RgbaImage {
  if image.width() == side && image.height() == side {
    return image.to_rgba8();
  }
  imageops::resize(image, side, side, FilterType::CatmullRom)
}
