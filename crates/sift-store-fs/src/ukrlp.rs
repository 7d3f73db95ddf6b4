//! [`FsUkrlpStore`] — filesystem point-in-time store for UKRLP snapshots.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sift_core::{Result, store::UkrlpStore, ukrlp::Provider};
use tokio::sync::Mutex;

use crate::{
  fsio::{corrupt, read_json_opt, write_json},
  version_index::VersionIndex,
};

/// UKRLP provider snapshots under `{data_dir}/ukrlp/`, keyed by UKPRN.
pub struct FsUkrlpStore {
  dir:       PathBuf,
  providers: Mutex<VersionIndex<i64>>,
}

impl FsUkrlpStore {
  /// Open the store under `data_dir`, loading the version index.
  pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
    let dir = data_dir.as_ref().join("ukrlp");
    Ok(Self {
      providers: Mutex::new(VersionIndex::load(&dir, "providers-index").await?),
      dir,
    })
  }

  fn payload_path(&self, ukprn: i64, date: NaiveDate) -> PathBuf {
    self
      .dir
      .join(format!("provider-{ukprn}-{}.json", date.format("%Y%m%d")))
  }
}

impl UkrlpStore for FsUkrlpStore {
  async fn provider(&self, ukprn: i64, _as_of: NaiveDate) -> Result<Option<Provider>> {
    let Some(date) = self.providers.lock().await.latest(&ukprn) else {
      return Ok(None);
    };
    let path = self.payload_path(ukprn, date);
    match read_json_opt(&path).await? {
      Some(provider) => Ok(Some(provider)),
      None => Err(corrupt(&path, "version index references a missing snapshot")),
    }
  }

  async fn store_provider(&self, provider: &Provider, date: NaiveDate) -> Result<()> {
    let path = self.payload_path(provider.ukprn, date);
    write_json(&path, provider).await?;
    self.providers.lock().await.add(provider.ukprn, date);
    Ok(())
  }

  async fn flush(&self) -> Result<()> {
    self.providers.lock().await.flush().await
  }
}
