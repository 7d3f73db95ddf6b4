//! In-memory collaborator implementations for pipeline tests.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::NaiveDate;
use sift_core::{
  Error, Result,
  cancel::CancelFlag,
  gias::{Establishment, GiasDayData, Group, LocalAuthority},
  registry::RegisteredEntity,
  statistics::DateStatistics,
  store::{
    AppStateStore, GiasDaySource, GiasStore, RegistryStore, StatisticsStore,
    Translator, UkrlpDaySource, UkrlpStore,
  },
  ukrlp::{Provider, UkrlpDayData},
};
use uuid::Uuid;

// ─── GIAS snapshots ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemGiasStore {
  establishments:    Mutex<HashMap<i64, BTreeMap<NaiveDate, Establishment>>>,
  groups:            Mutex<HashMap<i64, BTreeMap<NaiveDate, Group>>>,
  local_authorities: Mutex<HashMap<i32, BTreeMap<NaiveDate, LocalAuthority>>>,
  flushes:           AtomicUsize,
  cancel_on_store:   Mutex<Option<CancelFlag>>,
}

impl MemGiasStore {
  /// Arrange for the given flag to be cancelled as soon as an establishment
  /// snapshot is stored, simulating a user interrupt mid-loop.
  pub fn cancel_after_first_store(&self, cancel: &CancelFlag) {
    *self.cancel_on_store.lock().unwrap() = Some(cancel.clone());
  }

  pub fn flushes(&self) -> usize { self.flushes.load(Ordering::SeqCst) }

  pub fn establishment_dates(&self, urn: i64) -> Vec<NaiveDate> {
    self
      .establishments
      .lock()
      .unwrap()
      .get(&urn)
      .map(|versions| versions.keys().copied().collect())
      .unwrap_or_default()
  }
}

impl GiasStore for MemGiasStore {
  async fn establishment(
    &self,
    urn: i64,
    _as_of: NaiveDate,
  ) -> Result<Option<Establishment>> {
    Ok(
      self
        .establishments
        .lock()
        .unwrap()
        .get(&urn)
        .and_then(|versions| versions.last_key_value())
        .map(|(_, e)| e.clone()),
    )
  }

  async fn store_establishment(
    &self,
    establishment: &Establishment,
    date: NaiveDate,
  ) -> Result<()> {
    self
      .establishments
      .lock()
      .unwrap()
      .entry(establishment.urn)
      .or_default()
      .insert(date, establishment.clone());
    if let Some(cancel) = self.cancel_on_store.lock().unwrap().as_ref() {
      cancel.cancel();
    }
    Ok(())
  }

  async fn group(&self, uid: i64, _as_of: NaiveDate) -> Result<Option<Group>> {
    Ok(
      self
        .groups
        .lock()
        .unwrap()
        .get(&uid)
        .and_then(|versions| versions.last_key_value())
        .map(|(_, g)| g.clone()),
    )
  }

  async fn store_group(&self, group: &Group, date: NaiveDate) -> Result<()> {
    self
      .groups
      .lock()
      .unwrap()
      .entry(group.uid)
      .or_default()
      .insert(date, group.clone());
    Ok(())
  }

  async fn local_authority(
    &self,
    code: i32,
    _as_of: NaiveDate,
  ) -> Result<Option<LocalAuthority>> {
    Ok(
      self
        .local_authorities
        .lock()
        .unwrap()
        .get(&code)
        .and_then(|versions| versions.last_key_value())
        .map(|(_, la)| la.clone()),
    )
  }

  async fn store_local_authority(
    &self,
    local_authority: &LocalAuthority,
    date: NaiveDate,
  ) -> Result<()> {
    self
      .local_authorities
      .lock()
      .unwrap()
      .entry(local_authority.code)
      .or_default()
      .insert(date, local_authority.clone());
    Ok(())
  }

  async fn flush(&self) -> Result<()> {
    self.flushes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

// ─── UKRLP snapshots ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemUkrlpStore {
  providers: Mutex<HashMap<i64, BTreeMap<NaiveDate, Provider>>>,
  flushes:   AtomicUsize,
}

impl MemUkrlpStore {
  pub fn flushes(&self) -> usize { self.flushes.load(Ordering::SeqCst) }
}

impl UkrlpStore for MemUkrlpStore {
  async fn provider(&self, ukprn: i64, _as_of: NaiveDate) -> Result<Option<Provider>> {
    Ok(
      self
        .providers
        .lock()
        .unwrap()
        .get(&ukprn)
        .and_then(|versions| versions.last_key_value())
        .map(|(_, p)| p.clone()),
    )
  }

  async fn store_provider(&self, provider: &Provider, date: NaiveDate) -> Result<()> {
    self
      .providers
      .lock()
      .unwrap()
      .entry(provider.ukprn)
      .or_default()
      .insert(date, provider.clone());
    Ok(())
  }

  async fn flush(&self) -> Result<()> {
    self.flushes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

fn source_key(entity_type: &str, source_system_name: &str, source_system_id: &str) -> String {
  format!("{entity_type}:{source_system_name}:{source_system_id}").to_lowercase()
}

#[derive(Default)]
pub struct MemRegistryStore {
  entities:     Mutex<HashMap<Uuid, RegisteredEntity>>,
  source_index: Mutex<HashMap<String, Vec<(NaiveDate, Uuid)>>>,
  flushes:      AtomicUsize,
}

impl MemRegistryStore {
  pub fn flushes(&self) -> usize { self.flushes.load(Ordering::SeqCst) }

  pub fn closed_version_count(&self, valid_to: NaiveDate) -> usize {
    self
      .entities
      .lock()
      .unwrap()
      .values()
      .filter(|e| e.valid_to == Some(valid_to))
      .count()
  }
}

impl RegistryStore for MemRegistryStore {
  async fn registered_entity(
    &self,
    entity_type: &str,
    source_system_name: &str,
    source_system_id: &str,
    _as_of: NaiveDate,
  ) -> Result<Option<RegisteredEntity>> {
    let id = self
      .source_index
      .lock()
      .unwrap()
      .get(&source_key(entity_type, source_system_name, source_system_id))
      .and_then(|versions| versions.last())
      .map(|(_, id)| *id);
    let Some(id) = id else {
      return Ok(None);
    };
    Ok(self.entities.lock().unwrap().get(&id).cloned())
  }

  async fn store(&self, entity: &RegisteredEntity, _date: NaiveDate) -> Result<()> {
    self.entities.lock().unwrap().insert(entity.id, entity.clone());

    let mut index = self.source_index.lock().unwrap();
    for linked in &entity.entities {
      let versions = index
        .entry(source_key(
          &linked.entity_type,
          &linked.source_system_name,
          &linked.source_system_id,
        ))
        .or_default();
      versions.retain(|(date, _)| *date != entity.valid_from);
      versions.push((entity.valid_from, entity.id));
    }
    Ok(())
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    self.entities.lock().unwrap().remove(&id);
    self.source_index.lock().unwrap().retain(|_, versions| {
      versions.retain(|(_, entry)| *entry != id);
      !versions.is_empty()
    });
    Ok(())
  }

  async fn flush(&self) -> Result<()> {
    self.flushes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

// ─── Translation ─────────────────────────────────────────────────────────────

pub struct MemTranslator;

impl Translator for MemTranslator {
  async fn translate(
    &self,
    enum_name: &str,
    source_system: &str,
    source_value: &str,
  ) -> Result<String> {
    match enum_name {
      "ManagementGroupType" => match source_value {
        "Trust" | "Single-academy trust" | "Multi-academy trust" => {
          Ok("Trust".into())
        }
        "Federation" => Ok("Federation".into()),
        "LA" => Ok("LocalAuthority".into()),
        _ => Err(Error::MissingTranslation {
          enum_name:     enum_name.into(),
          source_system: source_system.into(),
          source_value:  source_value.into(),
        }),
      },
      // Type, sub-type and status codes pass through unchanged in tests.
      "ProviderType" | "ProviderSubType" | "ProviderStatus" => {
        Ok(source_value.into())
      }
      _ => Err(Error::UnknownEnum {
        enum_name:     enum_name.into(),
        source_system: source_system.into(),
      }),
    }
  }
}

// ─── App state ───────────────────────────────────────────────────────────────

pub struct MemAppState {
  initial: NaiveDate,
  last:    Mutex<Option<NaiveDate>>,
}

impl MemAppState {
  pub fn new(initial: NaiveDate) -> Self {
    Self { initial, last: Mutex::new(None) }
  }
}

impl AppStateStore for MemAppState {
  async fn last_date_processed(&self) -> Result<NaiveDate> {
    Ok(self.last.lock().unwrap().unwrap_or(self.initial))
  }

  async fn set_last_date_processed(&self, date: NaiveDate) -> Result<()> {
    *self.last.lock().unwrap() = Some(date);
    Ok(())
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStatistics {
  recorded: Mutex<Vec<DateStatistics>>,
}

impl MemStatistics {
  pub fn recorded(&self) -> Vec<DateStatistics> {
    self.recorded.lock().unwrap().clone()
  }
}

impl StatisticsStore for MemStatistics {
  async fn record(&self, statistics: &DateStatistics) -> Result<()> {
    self.recorded.lock().unwrap().push(statistics.clone());
    Ok(())
  }
}

// ─── Day-data sources ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemGiasDays {
  days:      Mutex<HashMap<NaiveDate, GiasDayData>>,
  requested: Mutex<Vec<NaiveDate>>,
}

impl MemGiasDays {
  pub fn insert(&self, date: NaiveDate, day: GiasDayData) {
    self.days.lock().unwrap().insert(date, day);
  }

  pub fn requested(&self) -> Vec<NaiveDate> {
    self.requested.lock().unwrap().clone()
  }
}

impl GiasDaySource for MemGiasDays {
  async fn day_data(&self, date: NaiveDate) -> Result<GiasDayData> {
    self.requested.lock().unwrap().push(date);
    Ok(self.days.lock().unwrap().get(&date).cloned().unwrap_or_default())
  }
}

#[derive(Default)]
pub struct MemUkrlpDays {
  days: Mutex<HashMap<NaiveDate, UkrlpDayData>>,
}

impl UkrlpDaySource for MemUkrlpDays {
  async fn day_data(&self, date: NaiveDate) -> Result<UkrlpDayData> {
    Ok(self.days.lock().unwrap().get(&date).cloned().unwrap_or_default())
  }
}
