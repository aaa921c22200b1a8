pub mod record;
pub mod tile;

pub use record::{AvatarRecord, ManifestEntry};
pub use tile::Tile;
