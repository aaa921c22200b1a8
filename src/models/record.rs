use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the listing response.
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarRecord {
  #[serde(default)]
  pub id: Option<Value>,
  #[serde(default)]
  pub url: Option<String>,
}

impl AvatarRecord {
  /// Source location, if the record carries a usable one.
  pub fn source(&self) -> Option<&str> {
    self.url.as_deref().filter(|u| !u.is_empty())
  }

  /// Identifier used for the tile file; falls back to the batch position
  /// when the listing omits it.
  pub fn identifier(&self, batch: u32, index: usize) -> String {
    match &self.id {
      Some(Value::String(s)) if !s.is_empty() => s.clone(),
      Some(Value::Null) | None => format!("avatar_b{}_{}", batch, index),
      Some(Value::String(_)) => format!("avatar_b{}_{}", batch, index),
      Some(other) => other.to_string(),
    }
  }
}

/// Row of the download manifest, in download order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
  pub index: usize,
  pub id: String,
  pub url: String,
  pub file: String,
}
