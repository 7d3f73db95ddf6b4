//! Per-key index of snapshot version dates.
//!
//! The index is loaded into memory at open, mutated freely during a day and
//! rewritten to disk only on [`flush`](VersionIndex::flush). Payload files
//! are durable the moment they are written; an unflushed index entry simply
//! leaves its payload invisible, which is what makes re-running a partially
//! processed day safe.

use std::{
  collections::HashMap,
  hash::Hash,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use sift_core::Result;

use crate::fsio::{read_json_opt, write_json};

/// An unordered, deduplicated set of version dates per natural key, persisted
/// as a single JSON object (`{name}.json`).
#[derive(Debug)]
pub struct VersionIndex<K> {
  path:    PathBuf,
  entries: HashMap<K, Vec<NaiveDate>>,
}

impl<K> VersionIndex<K>
where
  K: Eq + Hash + Serialize + DeserializeOwned,
{
  /// Load `{name}.json` from `directory`, or start empty if absent.
  pub async fn load(directory: &Path, name: &str) -> Result<Self> {
    let path = directory.join(format!("{name}.json"));
    let entries = read_json_opt(&path).await?.unwrap_or_default();
    Ok(Self { path, entries })
  }

  /// The most recent date ever recorded for `key`.
  ///
  /// Not filtered to any as-of bound: callers process days strictly in
  /// calendar order, so the most recent recorded date is the previous
  /// version.
  pub fn latest(&self, key: &K) -> Option<NaiveDate> {
    self
      .entries
      .get(key)
      .and_then(|dates| dates.iter().copied().max())
  }

  /// Record `date` as a version of `key`. No-op if already recorded.
  pub fn add(&mut self, key: K, date: NaiveDate) {
    let dates = self.entries.entry(key).or_default();
    if !dates.contains(&date) {
      dates.push(date);
    }
  }

  /// All recorded dates for `key`, in recording order.
  pub fn dates(&self, key: &K) -> Option<&[NaiveDate]> {
    self.entries.get(key).map(Vec::as_slice)
  }

  /// Rewrite the index file with the in-memory state.
  pub async fn flush(&self) -> Result<()> {
    write_json(&self.path, &self.entries).await
  }
}
