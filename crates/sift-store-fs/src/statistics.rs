//! [`FsStatisticsStore`] — one JSON statistics object per processed day.

use std::path::{Path, PathBuf};

use sift_core::{Result, statistics::DateStatistics, store::StatisticsStore};

use crate::fsio::write_json;

/// Writes `{data_dir}/stats/{yyyy-mm-dd}.json` per day. Re-processing a day
/// overwrites its statistics.
pub struct FsStatisticsStore {
  dir: PathBuf,
}

impl FsStatisticsStore {
  pub fn new(data_dir: impl AsRef<Path>) -> Self {
    Self { dir: data_dir.as_ref().join("stats") }
  }
}

impl StatisticsStore for FsStatisticsStore {
  async fn record(&self, statistics: &DateStatistics) -> Result<()> {
    let path = self
      .dir
      .join(format!("{}.json", statistics.date.format("%Y-%m-%d")));
    write_json(&path, statistics).await
  }
}
