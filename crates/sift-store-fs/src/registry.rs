//! [`FsRegistryStore`] — filesystem store of registry entries with a
//! source-identity index and an entity-type index.

use std::{
  collections::HashMap,
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sift_core::{
  Result,
  registry::{EntityPointer, RegisteredEntity},
  store::RegistryStore,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::fsio::{corrupt, read_json_opt, write_json};

// ─── Index ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatedId {
  date: NaiveDate,
  id:   Uuid,
}

/// The two registry indices, held in memory and flushed once per day.
///
/// Source-identity lookups return the most recently *added* entry for the
/// key, not the most recent date ≤ some bound; days are processed strictly
/// in calendar order, which keeps the two equivalent.
#[derive(Debug, Default)]
struct RegistryIndex {
  /// `"{entity_type}:{source_system_name}:{source_system_id}"` (lowercase)
  /// → insertion-ordered (date, id) entries.
  source_entities: HashMap<String, Vec<DatedId>>,
  /// Entity type → every registry id of that type, including closed
  /// versions (enumeration/export by type).
  entity_types:    HashMap<String, Vec<Uuid>>,
}

fn source_key(pointer: &EntityPointer) -> String {
  pointer.to_string().to_lowercase()
}

impl RegistryIndex {
  fn lookup(&self, pointer: &EntityPointer) -> Option<Uuid> {
    self
      .source_entities
      .get(&source_key(pointer))
      .and_then(|versions| versions.last())
      .map(|entry| entry.id)
  }

  /// Index `entity` under every contributing source identity at `date`.
  /// A same-date re-add replaces that date's entry and moves it to the end.
  fn add(&mut self, entity: &RegisteredEntity, date: NaiveDate) {
    for linked in &entity.entities {
      let key = source_key(&linked.pointer());
      let versions = self.source_entities.entry(key).or_default();
      versions.retain(|entry| entry.date != date);
      versions.push(DatedId { date, id: entity.id });
    }

    let ids = self.entity_types.entry(entity.entity_type.clone()).or_default();
    if !ids.contains(&entity.id) {
      ids.push(entity.id);
    }
  }

  /// Remove `id` from every bucket of both indices, pruning empty buckets.
  fn remove(&mut self, id: Uuid) {
    self.source_entities.retain(|_, versions| {
      versions.retain(|entry| entry.id != id);
      !versions.is_empty()
    });
    self.entity_types.retain(|_, ids| {
      ids.retain(|entry| *entry != id);
      !ids.is_empty()
    });
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// On-disk shape of a registry entry: the entity plus its partition hint.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRegisteredEntity {
  partition_key: Option<String>,
  #[serde(flatten)]
  entity:        RegisteredEntity,
}

/// Registry entries under `{data_dir}/registry/`: one `{id}.json` object per
/// version, plus `source-entity-index.json` and `entity-type-index.json`.
pub struct FsRegistryStore {
  dir:   PathBuf,
  index: Mutex<RegistryIndex>,
}

impl FsRegistryStore {
  /// Open the store under `data_dir`, loading both indices.
  pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
    let dir = data_dir.as_ref().join("registry");
    let index = RegistryIndex {
      source_entities: read_json_opt(&dir.join("source-entity-index.json"))
        .await?
        .unwrap_or_default(),
      entity_types:    read_json_opt(&dir.join("entity-type-index.json"))
        .await?
        .unwrap_or_default(),
    };
    Ok(Self { dir, index: Mutex::new(index) })
  }

  fn entity_path(&self, id: Uuid) -> PathBuf {
    self.dir.join(format!("{id}.json"))
  }

  /// Registry ids of the given type, in recording order.
  pub async fn ids_of_type(&self, entity_type: &str) -> Vec<Uuid> {
    self
      .index
      .lock()
      .await
      .entity_types
      .get(entity_type)
      .cloned()
      .unwrap_or_default()
  }
}

impl RegistryStore for FsRegistryStore {
  async fn registered_entity(
    &self,
    entity_type: &str,
    source_system_name: &str,
    source_system_id: &str,
    _as_of: NaiveDate,
  ) -> Result<Option<RegisteredEntity>> {
    let pointer = EntityPointer {
      entity_type:        entity_type.into(),
      source_system_name: source_system_name.into(),
      source_system_id:   source_system_id.into(),
    };
    let Some(id) = self.index.lock().await.lookup(&pointer) else {
      return Ok(None);
    };

    let path = self.entity_path(id);
    match read_json_opt::<StoredRegisteredEntity>(&path).await? {
      Some(stored) => Ok(Some(stored.entity)),
      None => Err(corrupt(&path, "registry index references a missing entity")),
    }
  }

  async fn store(&self, entity: &RegisteredEntity, _date: NaiveDate) -> Result<()> {
    let stored = StoredRegisteredEntity {
      partition_key: entity.partition_key(),
      entity:        entity.clone(),
    };
    write_json(&self.entity_path(entity.id), &stored).await?;

    // Indexed under the version's own validity start: a closed version
    // replaces its original entry, a new version appends at its start date.
    self.index.lock().await.add(entity, entity.valid_from);
    Ok(())
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    match tokio::fs::remove_file(self.entity_path(id)).await {
      Ok(()) => {}
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => return Err(e.into()),
    }
    self.index.lock().await.remove(id);
    Ok(())
  }

  async fn flush(&self) -> Result<()> {
    let index = self.index.lock().await;
    write_json(&self.dir.join("source-entity-index.json"), &index.source_entities)
      .await?;
    write_json(&self.dir.join("entity-type-index.json"), &index.entity_types)
      .await?;
    Ok(())
  }
}
