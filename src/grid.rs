//! Fixed-column grid compositing.
//!
//! Tiles are laid out row-major: index `i` lands in row `i / columns`,
//! column `i % columns`, at pixel offset `(col * side, row * side)`. Slots
//! past the last tile in the final row stay fully transparent.

use image::imageops;
use image::{DynamicImage, RgbaImage};
use log::debug;

use crate::error::{ComposeError, OverwriteError};
use crate::models::tile::{fit_square, Tile};

/// Grid dimensions derived from a tile count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
  pub columns: u32,
  pub rows: u32,
  pub tile_side: u32,
}

/// One grid cell, addressed both by flattened index and by row/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
  pub index: u32,
  pub row: u32,
  pub col: u32,
}

impl GridLayout {
  /// Layout with enough rows for `count` tiles (ceiling division). Fails
  /// when the canvas would not be addressable in `u32` pixels.
  pub fn for_count(count: u32, columns: u32, tile_side: u32) -> Result<GridLayout, ComposeError> {
    if columns == 0 {
      return Err(ComposeError::ZeroColumns);
    }
    GridLayout::checked(columns, count.div_ceil(columns), tile_side)
      .ok_or(ComposeError::TooLarge { count, columns, tile_side })
  }

  /// Layout recovered from the pixel size of an existing composite. The
  /// tile side is `width / columns`; every row is counted as full.
  pub fn from_dimensions(width: u32, height: u32, columns: u32) -> Result<GridLayout, OverwriteError> {
    let invalid = OverwriteError::InvalidComposite { width, height, columns };
    if columns == 0 || width == 0 || width % columns != 0 {
      return Err(invalid);
    }
    let tile_side = width / columns;
    if height == 0 || height % tile_side != 0 {
      return Err(invalid);
    }
    GridLayout::checked(columns, height / tile_side, tile_side).ok_or(invalid)
  }

  // Width, height and capacity all fit in u32 for every layout built here.
  fn checked(columns: u32, rows: u32, tile_side: u32) -> Option<GridLayout> {
    columns.checked_mul(tile_side)?;
    rows.checked_mul(tile_side)?;
    rows.checked_mul(columns)?;
    Some(GridLayout { columns, rows, tile_side })
  }

  pub fn width(&self) -> u32 {
    self.columns * self.tile_side
  }

  pub fn height(&self) -> u32 {
    self.rows * self.tile_side
  }

  pub fn capacity(&self) -> u32 {
    self.rows * self.columns
  }

  pub fn slot(&self, index: u32) -> Slot {
    Slot {
      index,
      row: index / self.columns,
      col: index % self.columns,
    }
  }

  /// Top-left pixel of `slot`.
  pub fn offset(&self, slot: Slot) -> (u32, u32) {
    (slot.col * self.tile_side, slot.row * self.tile_side)
  }

  /// The final slot of the bottom row, whether or not a tile occupies it.
  pub fn last_slot(&self) -> Slot {
    self.slot(self.capacity() - 1)
  }
}

/// Place `tiles` into a transparent canvas `columns` tiles wide.
///
/// The side of the first tile is taken as the side of all of them; tiles are
/// copied without blending.
pub fn compose(tiles: &[Tile], columns: u32) -> Result<RgbaImage, ComposeError> {
  let first = tiles.first().ok_or(ComposeError::EmptyInput)?;
  let count = u32::try_from(tiles.len()).map_err(|_| ComposeError::TooLarge {
    count: u32::MAX,
    columns,
    tile_side: first.side(),
  })?;
  let layout = GridLayout::for_count(count, columns, first.side())?;
  debug!(
    "Composing {} tiles into {}x{} grid ({}x{} px)",
    tiles.len(), layout.columns, layout.rows, layout.width(), layout.height()
  );

  let mut canvas = RgbaImage::new(layout.width(), layout.height());
  for (i, tile) in tiles.iter().enumerate() {
    let (x, y) = layout.offset(layout.slot(i as u32));
    imageops::replace(&mut canvas, &tile.image, x as i64, y as i64);
  }
  Ok(canvas)
}

/// Replace the last slot of `composite` with `replacement`, stretched to the
/// tile side. The slot is derived from the composite's dimensions alone, so
/// a partially filled bottom row gets its trailing padding slot replaced.
pub fn overwrite_last_slot(
  composite: &mut RgbaImage,
  replacement: &DynamicImage,
  columns: u32,
) -> Result<Slot, OverwriteError> {
  let layout = GridLayout::from_dimensions(composite.width(), composite.height(), columns)?;
  let slot = layout.last_slot();
  let (x, y) = layout.offset(slot);
  let resized = fit_square(replacement, layout.tile_side);
  imageops::replace(composite, &resized, x as i64, y as i64);
  Ok(slot)
}
