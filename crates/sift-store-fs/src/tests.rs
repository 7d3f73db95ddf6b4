//! Integration tests for the filesystem stores against temp directories.

use chrono::NaiveDate;
use sift_core::{
  Error,
  gias::{CodeNamePair, Establishment, GiasDayData, Group, LocalAuthority},
  registry::{LinkedEntity, RegisteredEntity, entity_type, source_system},
  statistics::DateStatistics,
  store::{
    AppStateStore, GiasDaySource, GiasStore, RegistryStore, StatisticsStore,
    Translator, UkrlpStore,
  },
  ukrlp::Provider,
};
use tempfile::TempDir;
use uuid::Uuid;

use crate::{
  FileTranslator, FsAppStateStore, FsGiasDaySource, FsGiasStore,
  FsRegistryStore, FsStatisticsStore, FsUkrlpStore, VersionIndex,
};

fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

fn establishment(urn: i64, name: &str) -> Establishment {
  Establishment {
    urn,
    establishment_name: Some(name.into()),
    la: Some(CodeNamePair {
      code:         Some("201".into()),
      display_name: Some("City of London".into()),
    }),
    ..Establishment::default()
  }
}

fn registered(
  entity_type_name: &str,
  system: &str,
  id: &str,
  valid_from: NaiveDate,
) -> RegisteredEntity {
  RegisteredEntity {
    id: RegisteredEntity::deterministic_id(entity_type_name, system, id, valid_from),
    entity_type: entity_type_name.into(),
    valid_from,
    valid_to: None,
    entities: vec![LinkedEntity {
      entity_type:        entity_type_name.into(),
      source_system_name: system.into(),
      source_system_id:   id.into(),
      ..LinkedEntity::default()
    }],
    links: vec![],
  }
}

// ─── Version index ───────────────────────────────────────────────────────────

#[tokio::test]
async fn version_index_dedupes_same_date() {
  let dir = TempDir::new().unwrap();
  let mut index: VersionIndex<i64> =
    VersionIndex::load(dir.path(), "test-index").await.unwrap();

  index.add(100001, date("2024-01-05"));
  index.add(100001, date("2024-01-05"));

  assert_eq!(index.dates(&100001).unwrap(), &[date("2024-01-05")]);
}

#[tokio::test]
async fn version_index_latest_is_max_recorded() {
  let dir = TempDir::new().unwrap();
  let mut index: VersionIndex<i64> =
    VersionIndex::load(dir.path(), "test-index").await.unwrap();

  index.add(1, date("2024-01-07"));
  index.add(1, date("2024-01-05"));
  index.add(1, date("2024-01-06"));

  assert_eq!(index.latest(&1), Some(date("2024-01-07")));
  assert_eq!(index.latest(&2), None);
}

#[tokio::test]
async fn version_index_survives_flush_and_reload() {
  let dir = TempDir::new().unwrap();

  let mut index: VersionIndex<i64> =
    VersionIndex::load(dir.path(), "test-index").await.unwrap();
  index.add(1, date("2024-01-05"));
  index.flush().await.unwrap();

  let reloaded: VersionIndex<i64> =
    VersionIndex::load(dir.path(), "test-index").await.unwrap();
  assert_eq!(reloaded.latest(&1), Some(date("2024-01-05")));
}

// ─── GIAS snapshots ──────────────────────────────────────────────────────────

#[tokio::test]
async fn establishment_snapshot_round_trip() {
  let dir = TempDir::new().unwrap();
  let store = FsGiasStore::open(dir.path()).await.unwrap();

  let stored = establishment(100001, "Sample Primary School");
  store
    .store_establishment(&stored, date("2024-01-05"))
    .await
    .unwrap();

  let fetched = store
    .establishment(100001, date("2024-01-05"))
    .await
    .unwrap();
  assert_eq!(fetched, Some(stored));
}

#[tokio::test]
async fn missing_snapshot_is_none_not_an_error() {
  let dir = TempDir::new().unwrap();
  let store = FsGiasStore::open(dir.path()).await.unwrap();

  assert!(
    store
      .establishment(999999, date("2024-01-05"))
      .await
      .unwrap()
      .is_none()
  );
  assert!(store.group(999999, date("2024-01-05")).await.unwrap().is_none());
  assert!(
    store
      .local_authority(999, date("2024-01-05"))
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn get_returns_most_recently_stored_version() {
  let dir = TempDir::new().unwrap();
  let store = FsGiasStore::open(dir.path()).await.unwrap();

  store
    .store_establishment(&establishment(100001, "Old Name"), date("2024-01-05"))
    .await
    .unwrap();
  store
    .store_establishment(&establishment(100001, "New Name"), date("2024-01-06"))
    .await
    .unwrap();

  let fetched = store
    .establishment(100001, date("2024-01-06"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.establishment_name.as_deref(), Some("New Name"));
}

#[tokio::test]
async fn same_day_overwrite_replaces_payload() {
  let dir = TempDir::new().unwrap();
  let store = FsGiasStore::open(dir.path()).await.unwrap();

  store
    .store_establishment(&establishment(100001, "First Write"), date("2024-01-05"))
    .await
    .unwrap();
  store
    .store_establishment(&establishment(100001, "Second Write"), date("2024-01-05"))
    .await
    .unwrap();

  let fetched = store
    .establishment(100001, date("2024-01-05"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.establishment_name.as_deref(), Some("Second Write"));
}

#[tokio::test]
async fn gias_indices_survive_flush_and_reopen() {
  let dir = TempDir::new().unwrap();

  {
    let store = FsGiasStore::open(dir.path()).await.unwrap();
    store
      .store_group(&Group { uid: 2000, ..Group::default() }, date("2024-01-05"))
      .await
      .unwrap();
    store
      .store_local_authority(
        &LocalAuthority { code: 201, name: Some("City of London".into()) },
        date("2024-01-05"),
      )
      .await
      .unwrap();
    store.flush().await.unwrap();
  }

  let reopened = FsGiasStore::open(dir.path()).await.unwrap();
  assert!(reopened.group(2000, date("2024-01-06")).await.unwrap().is_some());
  assert!(
    reopened
      .local_authority(201, date("2024-01-06"))
      .await
      .unwrap()
      .is_some()
  );
}

#[tokio::test]
async fn unflushed_index_is_invisible_after_reopen() {
  let dir = TempDir::new().unwrap();

  {
    let store = FsGiasStore::open(dir.path()).await.unwrap();
    store
      .store_establishment(&establishment(100001, "Unflushed"), date("2024-01-05"))
      .await
      .unwrap();
    // No flush: simulates a cancelled or crashed day.
  }

  let reopened = FsGiasStore::open(dir.path()).await.unwrap();
  assert!(
    reopened
      .establishment(100001, date("2024-01-06"))
      .await
      .unwrap()
      .is_none()
  );
}

// ─── UKRLP snapshots ─────────────────────────────────────────────────────────

#[tokio::test]
async fn provider_snapshot_round_trip() {
  let dir = TempDir::new().unwrap();
  let store = FsUkrlpStore::open(dir.path()).await.unwrap();

  let stored = Provider {
    ukprn: 10000001,
    provider_name: Some("Sample Training Ltd".into()),
    ..Provider::default()
  };
  store.store_provider(&stored, date("2024-01-05")).await.unwrap();

  let fetched = store.provider(10000001, date("2024-01-05")).await.unwrap();
  assert_eq!(fetched, Some(stored));
}

// ─── Registry store ──────────────────────────────────────────────────────────

#[tokio::test]
async fn registry_round_trip_by_source_identity() {
  let dir = TempDir::new().unwrap();
  let store = FsRegistryStore::open(dir.path()).await.unwrap();

  let entity = registered(
    entity_type::LEARNING_PROVIDER,
    source_system::GIAS,
    "100001",
    date("2024-01-05"),
  );
  store.store(&entity, date("2024-01-05")).await.unwrap();

  let fetched = store
    .registered_entity(
      entity_type::LEARNING_PROVIDER,
      source_system::GIAS,
      "100001",
      date("2024-01-05"),
    )
    .await
    .unwrap();
  assert_eq!(fetched, Some(entity));
}

#[tokio::test]
async fn registry_lookup_is_case_insensitive() {
  let dir = TempDir::new().unwrap();
  let store = FsRegistryStore::open(dir.path()).await.unwrap();

  let entity = registered(
    entity_type::MANAGEMENT_GROUP,
    source_system::GIAS,
    "Trust-1234",
    date("2024-01-05"),
  );
  store.store(&entity, date("2024-01-05")).await.unwrap();

  let fetched = store
    .registered_entity(
      entity_type::MANAGEMENT_GROUP,
      "gias",
      "TRUST-1234",
      date("2024-01-05"),
    )
    .await
    .unwrap();
  assert!(fetched.is_some());
}

#[tokio::test]
async fn registry_lookup_returns_most_recently_indexed_version() {
  let dir = TempDir::new().unwrap();
  let store = FsRegistryStore::open(dir.path()).await.unwrap();

  let mut closed = registered(
    entity_type::LEARNING_PROVIDER,
    source_system::GIAS,
    "100001",
    date("2024-01-05"),
  );
  store.store(&closed, date("2024-01-05")).await.unwrap();

  // Close the old version and store its replacement, as the resolver does.
  closed.valid_to = Some(date("2024-01-06"));
  store.store(&closed, date("2024-01-06")).await.unwrap();
  let latest = registered(
    entity_type::LEARNING_PROVIDER,
    source_system::GIAS,
    "100001",
    date("2024-01-06"),
  );
  store.store(&latest, date("2024-01-06")).await.unwrap();

  let fetched = store
    .registered_entity(
      entity_type::LEARNING_PROVIDER,
      source_system::GIAS,
      "100001",
      date("2024-01-06"),
    )
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.id, latest.id);
  assert!(fetched.is_current());
}

#[tokio::test]
async fn registry_delete_removes_entity_and_index_entries() {
  let dir = TempDir::new().unwrap();
  let store = FsRegistryStore::open(dir.path()).await.unwrap();

  let entity = registered(
    entity_type::LEARNING_PROVIDER,
    source_system::UKRLP,
    "10000001",
    date("2024-01-05"),
  );
  store.store(&entity, date("2024-01-05")).await.unwrap();
  store.delete(entity.id).await.unwrap();

  let fetched = store
    .registered_entity(
      entity_type::LEARNING_PROVIDER,
      source_system::UKRLP,
      "10000001",
      date("2024-01-05"),
    )
    .await
    .unwrap();
  assert!(fetched.is_none());
  assert!(store.ids_of_type(entity_type::LEARNING_PROVIDER).await.is_empty());

  // Deleting an id that is already gone is a no-op.
  store.delete(Uuid::nil()).await.unwrap();
}

#[tokio::test]
async fn registry_indices_survive_flush_and_reopen() {
  let dir = TempDir::new().unwrap();

  let entity = registered(
    entity_type::MANAGEMENT_GROUP,
    source_system::GIAS,
    "Trust-1234",
    date("2024-01-05"),
  );

  {
    let store = FsRegistryStore::open(dir.path()).await.unwrap();
    store.store(&entity, date("2024-01-05")).await.unwrap();
    store.flush().await.unwrap();
  }

  let reopened = FsRegistryStore::open(dir.path()).await.unwrap();
  let fetched = reopened
    .registered_entity(
      entity_type::MANAGEMENT_GROUP,
      source_system::GIAS,
      "Trust-1234",
      date("2024-01-06"),
    )
    .await
    .unwrap();
  assert_eq!(fetched.map(|e| e.id), Some(entity.id));
  assert_eq!(
    reopened.ids_of_type(entity_type::MANAGEMENT_GROUP).await,
    vec![entity.id]
  );
}

// ─── App state ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn app_state_defaults_to_initial_date() {
  let dir = TempDir::new().unwrap();
  let store = FsAppStateStore::new(dir.path(), date("2016-08-31"));

  assert_eq!(store.last_date_processed().await.unwrap(), date("2016-08-31"));
}

#[tokio::test]
async fn app_state_round_trip() {
  let dir = TempDir::new().unwrap();
  let store = FsAppStateStore::new(dir.path(), date("2016-08-31"));

  store.set_last_date_processed(date("2024-01-05")).await.unwrap();
  assert_eq!(store.last_date_processed().await.unwrap(), date("2024-01-05"));
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn statistics_are_written_per_day() {
  let dir = TempDir::new().unwrap();
  let store = FsStatisticsStore::new(dir.path());

  store
    .record(&DateStatistics {
      date:                      date("2024-01-05"),
      duration:                  std::time::Duration::from_secs(3),
      establishments_changed:    3,
      groups_changed:            0,
      local_authorities_changed: 1,
      providers_changed:         1,
      registry_entries_changed:  5,
    })
    .await
    .unwrap();

  assert!(dir.path().join("stats").join("2024-01-05.json").exists());
}

// ─── Day data ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_day_file_yields_empty_day() {
  let dir = TempDir::new().unwrap();
  let source = FsGiasDaySource::new(dir.path());

  let day = source.day_data(date("2024-01-05")).await.unwrap();
  assert!(day.establishments.is_empty());
  assert!(day.local_authorities.is_empty());
}

#[tokio::test]
async fn local_authorities_derived_when_day_file_omits_them() {
  let dir = TempDir::new().unwrap();
  let days = dir.path().join("days");
  std::fs::create_dir_all(&days).unwrap();

  let day = GiasDayData {
    establishments: vec![
      establishment(100001, "First School"),
      establishment(100002, "Second School"),
    ],
    ..GiasDayData::default()
  };
  std::fs::write(
    days.join("gias-20240105.json"),
    serde_json::to_vec(&day).unwrap(),
  )
  .unwrap();

  let loaded = FsGiasDaySource::new(dir.path())
    .day_data(date("2024-01-05"))
    .await
    .unwrap();
  assert_eq!(loaded.local_authorities.len(), 1);
  assert_eq!(loaded.local_authorities[0].code, 201);
  assert_eq!(
    loaded.local_authorities[0].name.as_deref(),
    Some("City of London")
  );
}

// ─── Translation ─────────────────────────────────────────────────────────────

fn translator() -> FileTranslator {
  let mappings = serde_json::json!({
    "GIAS": {
      "ManagementGroupType": {
        "Trust": ["Trust", "Single-academy trust", "Multi-academy trust"],
        "LocalAuthority": ["LA"],
      }
    }
  });
  FileTranslator::from_mappings(serde_json::from_value(mappings).unwrap())
}

#[tokio::test]
async fn translation_matches_case_insensitively() {
  let t = translator();
  let canonical = t
    .translate("managementgrouptype", "gias", "multi-academy trust")
    .await
    .unwrap();
  assert_eq!(canonical, "Trust");
}

#[tokio::test]
async fn translation_miss_is_fatal() {
  let t = translator();
  let err = t
    .translate("ManagementGroupType", "GIAS", "Unheard-of type")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MissingTranslation { .. }));

  let err = t.translate("ProviderStatus", "GIAS", "A").await.unwrap_err();
  assert!(matches!(err, Error::UnknownEnum { .. }));

  let err = t
    .translate("ManagementGroupType", "Unknown", "LA")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownSourceSystem(_)));
}
