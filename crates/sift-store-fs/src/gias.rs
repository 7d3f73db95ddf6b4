//! [`FsGiasStore`] — filesystem point-in-time store for GIAS snapshots.

use std::{
  fmt::Display,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use sift_core::{
  Result,
  gias::{Establishment, Group, LocalAuthority},
  store::GiasStore,
};
use tokio::sync::Mutex;

use crate::{
  fsio::{corrupt, read_json_opt, write_json},
  version_index::VersionIndex,
};

/// GIAS snapshots under `{data_dir}/gias/`: establishments keyed by URN,
/// groups by UID, local authorities by LA code.
pub struct FsGiasStore {
  dir:               PathBuf,
  establishments:    Mutex<VersionIndex<i64>>,
  groups:            Mutex<VersionIndex<i64>>,
  local_authorities: Mutex<VersionIndex<i32>>,
}

impl FsGiasStore {
  /// Open the store under `data_dir`, loading the version indices.
  pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
    let dir = data_dir.as_ref().join("gias");
    Ok(Self {
      establishments: Mutex::new(
        VersionIndex::load(&dir, "establishments-index").await?,
      ),
      groups: Mutex::new(VersionIndex::load(&dir, "groups-index").await?),
      local_authorities: Mutex::new(
        VersionIndex::load(&dir, "local-authorities-index").await?,
      ),
      dir,
    })
  }

  fn payload_path(&self, prefix: &str, key: impl Display, date: NaiveDate) -> PathBuf {
    self
      .dir
      .join(format!("{prefix}-{key}-{}.json", date.format("%Y%m%d")))
  }
}

impl GiasStore for FsGiasStore {
  async fn establishment(
    &self,
    urn: i64,
    _as_of: NaiveDate,
  ) -> Result<Option<Establishment>> {
    let Some(date) = self.establishments.lock().await.latest(&urn) else {
      return Ok(None);
    };
    let path = self.payload_path("establishment", urn, date);
    match read_json_opt(&path).await? {
      Some(establishment) => Ok(Some(establishment)),
      None => Err(corrupt(&path, "version index references a missing snapshot")),
    }
  }

  async fn store_establishment(
    &self,
    establishment: &Establishment,
    date: NaiveDate,
  ) -> Result<()> {
    let path = self.payload_path("establishment", establishment.urn, date);
    write_json(&path, establishment).await?;
    self.establishments.lock().await.add(establishment.urn, date);
    Ok(())
  }

  async fn group(&self, uid: i64, _as_of: NaiveDate) -> Result<Option<Group>> {
    let Some(date) = self.groups.lock().await.latest(&uid) else {
      return Ok(None);
    };
    let path = self.payload_path("group", uid, date);
    match read_json_opt(&path).await? {
      Some(group) => Ok(Some(group)),
      None => Err(corrupt(&path, "version index references a missing snapshot")),
    }
  }

  async fn store_group(&self, group: &Group, date: NaiveDate) -> Result<()> {
    let path = self.payload_path("group", group.uid, date);
    write_json(&path, group).await?;
    self.groups.lock().await.add(group.uid, date);
    Ok(())
  }

  async fn local_authority(
    &self,
    code: i32,
    _as_of: NaiveDate,
  ) -> Result<Option<LocalAuthority>> {
    let Some(date) = self.local_authorities.lock().await.latest(&code) else {
      return Ok(None);
    };
    let path = self.payload_path("localauthority", code, date);
    match read_json_opt(&path).await? {
      Some(local_authority) => Ok(Some(local_authority)),
      None => Err(corrupt(&path, "version index references a missing snapshot")),
    }
  }

  async fn store_local_authority(
    &self,
    local_authority: &LocalAuthority,
    date: NaiveDate,
  ) -> Result<()> {
    let path = self.payload_path("localauthority", local_authority.code, date);
    write_json(&path, local_authority).await?;
    self
      .local_authorities
      .lock()
      .await
      .add(local_authority.code, date);
    Ok(())
  }

  async fn flush(&self) -> Result<()> {
    self.establishments.lock().await.flush().await?;
    self.groups.lock().await.flush().await?;
    self.local_authorities.lock().await.flush().await?;
    Ok(())
  }
}
