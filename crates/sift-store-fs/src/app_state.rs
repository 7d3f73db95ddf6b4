//! [`FsAppStateStore`] — checkpoint of the last fully processed date.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use sift_core::{Result, store::AppStateStore};
use tokio::fs;

const FILE_NAME: &str = "last-processed-date.txt";

/// Plain-text checkpoint file under the data directory. Before the first run
/// the checkpoint reads as `initial_date`, so processing starts the day
/// after it.
pub struct FsAppStateStore {
  path:         PathBuf,
  initial_date: NaiveDate,
}

impl FsAppStateStore {
  pub fn new(data_dir: impl AsRef<Path>, initial_date: NaiveDate) -> Self {
    Self { path: data_dir.as_ref().join(FILE_NAME), initial_date }
  }
}

impl AppStateStore for FsAppStateStore {
  async fn last_date_processed(&self) -> Result<NaiveDate> {
    match fs::read_to_string(&self.path).await {
      Ok(content) => Ok(content.trim().parse()?),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(self.initial_date),
      Err(e) => Err(e.into()),
    }
  }

  async fn set_last_date_processed(&self, date: NaiveDate) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).await?;
    }
    fs::write(&self.path, date.format("%Y-%m-%d").to_string()).await?;
    Ok(())
  }
}
