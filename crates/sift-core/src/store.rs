//! Collaborator traits consumed by the pipeline.
//!
//! Implemented by storage backends (e.g. `sift-store-fs`). The pipeline
//! depends on these abstractions, not on any concrete backend.
//!
//! # Version selection
//!
//! The snapshot and registry lookups take an `as_of` date but resolve to the
//! *most recently recorded* version for the key, without filtering to dates
//! ≤ `as_of`. This is sound only because days are processed strictly in
//! calendar order by a single caller — a structural invariant the historical
//! loop upholds. Never call these out of date order.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Result,
  gias::{Establishment, GiasDayData, Group, LocalAuthority},
  registry::RegisteredEntity,
  statistics::DateStatistics,
  ukrlp::{Provider, UkrlpDayData},
};

// ─── Snapshot stores ─────────────────────────────────────────────────────────

/// Point-in-time snapshot store for the GIAS record types.
///
/// Payloads are immutable per (key, date) — a same-day overwrite replaces the
/// payload and leaves the version index untouched. The in-memory version
/// index is persisted only by [`flush`](GiasStore::flush), called once at the
/// end of each processed day.
pub trait GiasStore: Send + Sync {
  /// The most recently stored establishment snapshot, or `None` if the URN
  /// has never been stored.
  async fn establishment(
    &self,
    urn: i64,
    as_of: NaiveDate,
  ) -> Result<Option<Establishment>>;

  async fn store_establishment(
    &self,
    establishment: &Establishment,
    date: NaiveDate,
  ) -> Result<()>;

  async fn group(&self, uid: i64, as_of: NaiveDate) -> Result<Option<Group>>;

  async fn store_group(&self, group: &Group, date: NaiveDate) -> Result<()>;

  async fn local_authority(
    &self,
    code: i32,
    as_of: NaiveDate,
  ) -> Result<Option<LocalAuthority>>;

  async fn store_local_authority(
    &self,
    local_authority: &LocalAuthority,
    date: NaiveDate,
  ) -> Result<()>;

  /// Persist the version indices. The single durability boundary per day.
  async fn flush(&self) -> Result<()>;
}

/// Point-in-time snapshot store for UKRLP providers. Same contract as
/// [`GiasStore`].
pub trait UkrlpStore: Send + Sync {
  async fn provider(&self, ukprn: i64, as_of: NaiveDate) -> Result<Option<Provider>>;

  async fn store_provider(&self, provider: &Provider, date: NaiveDate) -> Result<()>;

  async fn flush(&self) -> Result<()>;
}

// ─── Registry store ──────────────────────────────────────────────────────────

/// Store of [`RegisteredEntity`] versions, indexed by source identity and by
/// entity type.
pub trait RegistryStore: Send + Sync {
  /// The registry entry most recently indexed under the given source
  /// identity, or `None`.
  async fn registered_entity(
    &self,
    entity_type: &str,
    source_system_name: &str,
    source_system_id: &str,
    as_of: NaiveDate,
  ) -> Result<Option<RegisteredEntity>>;

  /// Write the entity object immediately and index it under every
  /// contributing source identity.
  async fn store(&self, entity: &RegisteredEntity, date: NaiveDate) -> Result<()>;

  /// Remove the entity object and every index entry referencing its id.
  async fn delete(&self, id: Uuid) -> Result<()>;

  /// Persist both indices. The single durability boundary per day.
  async fn flush(&self) -> Result<()>;
}

// ─── Day-data sources ────────────────────────────────────────────────────────

/// Source of captured GIAS day extracts. An empty day is valid: no extract
/// was published for that date.
pub trait GiasDaySource: Send + Sync {
  async fn day_data(&self, date: NaiveDate) -> Result<GiasDayData>;
}

/// Source of captured UKRLP day extracts.
pub trait UkrlpDaySource: Send + Sync {
  async fn day_data(&self, date: NaiveDate) -> Result<UkrlpDayData>;
}

// ─── App state ───────────────────────────────────────────────────────────────

/// Checkpoint of the last fully processed date. Advanced only after a day
/// completes; there is no partial-day checkpoint.
pub trait AppStateStore: Send + Sync {
  async fn last_date_processed(&self) -> Result<NaiveDate>;

  async fn set_last_date_processed(&self, date: NaiveDate) -> Result<()>;
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Sink for per-day statistics.
pub trait StatisticsStore: Send + Sync {
  async fn record(&self, statistics: &DateStatistics) -> Result<()>;
}

// ─── Translation ─────────────────────────────────────────────────────────────

/// Enumeration names understood by [`Translator`] implementations.
pub mod enumeration {
  pub const MANAGEMENT_GROUP_TYPE: &str = "ManagementGroupType";
  pub const PROVIDER_TYPE:         &str = "ProviderType";
  pub const PROVIDER_SUB_TYPE:     &str = "ProviderSubType";
  pub const PROVIDER_STATUS:       &str = "ProviderStatus";
}

/// Translation of source-system enum values to their canonical form.
///
/// Mapping tables are loaded once per run; a missing mapping is fatal
/// ([`Error::MissingTranslation`](crate::Error::MissingTranslation)).
pub trait Translator: Send + Sync {
  async fn translate(
    &self,
    enum_name: &str,
    source_system: &str,
    source_value: &str,
  ) -> Result<String>;
}
