//! Avatar listing and download.

use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;

use crate::error::{DownloadError, FetchError};
use crate::models::{AvatarRecord, ManifestEntry, Tile};
use crate::store::{self, config::Settings};

const USER_AGENT: &str = concat!("avatargrid/", env!("CARGO_PKG_VERSION"));

/// Byte-level GET, injectable so batch logic can run without a network.
pub trait HttpClient {
  fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

#[derive(Clone)]
pub struct ReqwestClient {
  client: reqwest::Client,
}

impl ReqwestClient {
  pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .user_agent(USER_AGENT)
      .build()
      .map_err(|e| FetchError::Http(format!("unable to build client: {}", e)))?;
    Ok(ReqwestClient { client })
  }
}

impl HttpClient for ReqwestClient {
  async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| FetchError::Http(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        status: status.as_u16(),
        url: url.to_string(),
      });
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| FetchError::Http(format!("failed to read body: {}", e)))?;
    Ok(body.to_vec())
  }
}

/// Tiles in download order, with the matching manifest rows.
#[derive(Debug, Default)]
pub struct Harvest {
  pub tiles: Vec<Tile>,
  pub entries: Vec<ManifestEntry>,
}

impl Harvest {
  pub fn len(&self) -> usize {
    self.tiles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tiles.is_empty()
  }

  fn push(&mut self, tile: Tile, url: &str, file: String) {
    self.entries.push(ManifestEntry {
      index: self.tiles.len(),
      id: tile.id.clone(),
      url: url.to_string(),
      file,
    });
    self.tiles.push(tile);
  }

  /// Append a later batch, renumbering its manifest rows.
  fn extend(&mut self, batch: Harvest) {
    let offset = self.tiles.len();
    self.entries.extend(batch.entries.into_iter().map(|mut e| {
      e.index += offset;
      e
    }));
    self.tiles.extend(batch.tiles);
  }
}

pub async fn fetch_listing<C: HttpClient>(
  client: &C,
  settings: &Settings,
) -> Result<Vec<AvatarRecord>, FetchError> {
  let body = client.get(&settings.listing_url()).await?;
  serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
}

/// Fetch one avatar, normalise it and write `<output_dir>/<id>.png`.
pub async fn download_tile<C: HttpClient>(
  client: &C,
  settings: &Settings,
  id: &str,
  url: &str,
) -> Result<(Tile, String), DownloadError> {
  let bytes = client.get(url).await?;
  let tile = Tile::from_bytes(id, &bytes, settings.tile_side, settings.decode_limits())?;
  let file = settings.tile_file_name(id);
  store::write_png(&settings.output_dir.join(&file), &tile.image)?;
  Ok((tile, file))
}

/// One listing call and its downloads. A failed listing yields an empty
/// batch; a failed avatar is skipped.
pub async fn download_batch<C: HttpClient>(client: &C, settings: &Settings, batch: u32) -> Harvest {
  let mut harvest = Harvest::default();
  info!("Fetching batch {} from {}", batch, settings.api_url);

  let records = match fetch_listing(client, settings).await {
    Ok(r) => r,
    Err(err) => {
      warn!("Error with batch {}: {}", batch, err);
      return harvest;
    }
  };
  info!("Found {} avatars in batch {}", records.len(), batch);

  let total = records.len();
  for (i, record) in records.iter().enumerate() {
    let url = match record.source() {
      Some(u) => u,
      None => {
        warn!("Avatar {} in batch {} has no URL, skipping", i + 1, batch);
        continue;
      }
    };
    let id = record.identifier(batch, i);
    debug!("Downloading avatar {}/{} (batch {}): {}", i + 1, total, batch, url);

    match download_tile(client, settings, &id, url).await {
      Ok((tile, file)) => {
        debug!("Saved {} ({}x{})", file, settings.tile_side, settings.tile_side);
        harvest.push(tile, url, file);
      }
      Err(err) => warn!("Error downloading avatar {} in batch {}: {}", i + 1, batch, err),
    }
  }
  harvest
}

/// Run every batch in sequence and concatenate the results.
pub async fn download_all<C: HttpClient>(client: &C, settings: &Settings) -> Harvest {
  let mut all = Harvest::default();
  for batch in 1..=settings.batch_count {
    let harvest = download_batch(client, settings, batch).await;
    info!("Completed batch {}: {} avatars downloaded", batch, harvest.len());
    all.extend(harvest);
  }
  all
}

#[cfg(test)]
pub mod tests {
  use super::*;
  use image::{Rgba, RgbaImage};
  use std::cell::RefCell;
  use std::collections::{HashMap, VecDeque};

  /// Serves queued responses per URL; unknown URLs answer 404.
  #[derive(Default)]
  pub struct MockHttpClient {
    responses: RefCell<HashMap<String, VecDeque<Result<Vec<u8>, FetchError>>>>,
  }

  impl MockHttpClient {
    pub fn respond(&self, url: &str, response: Result<Vec<u8>, FetchError>) {
      self
        .responses
        .borrow_mut()
        .entry(url.to_string())
        .or_default()
        .push_back(response);
    }
  }

  impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
      let mut responses = self.responses.borrow_mut();
      let queue = responses.get_mut(url);
      match queue.and_then(|q| if q.len() > 1 { q.pop_front() } else { q.front().cloned() }) {
        Some(r) => r,
        None => Err(FetchError::Status { status: 404, url: url.to_string() }),
      }
    }
  }

  pub fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    store::encode_png(&RgbaImage::from_pixel(width, height, Rgba(pixel))).unwrap()
  }

  fn settings(dir: &std::path::Path, batch_count: u32) -> Settings {
    Settings {
      tile_side: 8,
      columns: 3,
      batch_size: 4,
      batch_count,
      api_url: "http://api.test/data".into(),
      output_dir: dir.to_path_buf(),
      ..Settings::default()
    }
  }

  #[tokio::test]
  async fn batch_skips_missing_urls_and_failed_downloads() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), 1);
    let client = MockHttpClient::default();
    client.respond(
      &settings.listing_url(),
      Ok(br#"[
        {"id": 1, "url": "http://img.test/1"},
        {"id": 2},
        {"id": 3, "url": "http://img.test/3"},
        {"id": 4, "url": "http://img.test/4"}
      ]"#.to_vec()),
    );
    client.respond("http://img.test/1", Ok(png_bytes(20, 10, [255, 0, 0, 255])));
    client.respond("http://img.test/4", Ok(b"garbage".to_vec()));

    let harvest = download_batch(&client, &settings, 1).await;
    assert_eq!(harvest.len(), 1);
    assert_eq!(harvest.tiles[0].id, "1");
    assert_eq!(harvest.tiles[0].image.dimensions(), (8, 8));
    assert_eq!(harvest.entries[0].file, "1.png");
    assert!(dir.path().join("1.png").exists());
    assert!(!dir.path().join("3.png").exists());
    assert!(!dir.path().join("4.png").exists());
  }

  #[tokio::test]
  async fn tile_id_cannot_clobber_composite() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), 1);
    let client = MockHttpClient::default();
    client.respond("http://img.test/m", Ok(png_bytes(8, 8, [1, 2, 3, 255])));

    let (_, file) = download_tile(&client, &settings, "merged_avatars", "http://img.test/m").await.unwrap();
    assert_eq!(file, "tile_merged_avatars.png");
    assert!(!settings.composite_path().exists());
  }

  #[tokio::test]
  async fn failed_listing_abandons_only_that_batch() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), 3);
    let client = MockHttpClient::default();
    let listing = settings.listing_url();
    client.respond(&listing, Ok(br#"[{"id": "a", "url": "http://img.test/a"}]"#.to_vec()));
    client.respond(&listing, Err(FetchError::Http("connection reset".into())));
    client.respond(&listing, Ok(br#"[{"url": "http://img.test/b"}]"#.to_vec()));
    client.respond("http://img.test/a", Ok(png_bytes(8, 8, [0, 0, 255, 255])));
    client.respond("http://img.test/b", Ok(png_bytes(8, 8, [0, 255, 0, 255])));

    let harvest = download_all(&client, &settings).await;
    assert_eq!(harvest.len(), 2);
    let ids: Vec<_> = harvest.entries.iter().map(|e| (e.index, e.id.as_str())).collect();
    assert_eq!(ids, vec![(0, "a"), (1, "avatar_b3_0")]);
  }

  #[tokio::test]
  async fn undecodable_listing_is_a_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), 1);
    let client = MockHttpClient::default();
    client.respond(&settings.listing_url(), Ok(b"<html>".to_vec()));
    assert!(matches!(fetch_listing(&client, &settings).await, Err(FetchError::Decode(_))));
  }
}
