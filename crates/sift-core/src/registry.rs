//! Registry records — the unified, time-versioned output of the pipeline.
//!
//! A [`RegisteredEntity`] is one version of one registry entry, possibly
//! backed by several source systems. Versions are closed (never mutated) by
//! setting `valid_to`; a replacement version is a new id. Links between
//! registry entries are expressed as string-keyed [`EntityPointer`]s resolved
//! through the registry index — never as live references.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Well-known names ────────────────────────────────────────────────────────

/// Registry entity types.
pub mod entity_type {
  pub const MANAGEMENT_GROUP:  &str = "management-group";
  pub const LEARNING_PROVIDER: &str = "learning-provider";
}

/// Source system names as they appear in registry identities.
pub mod source_system {
  pub const GIAS:  &str = "GIAS";
  pub const UKRLP: &str = "UKRLP";
}

/// Link provenance types.
pub mod link_type {
  pub const SYNONYM:          &str = "synonym";
  pub const MANAGEMENT_GROUP: &str = "ManagementGroup";
}

// ─── Pointers and links ──────────────────────────────────────────────────────

/// The source identity of a registry entry: entity type + source system +
/// source system id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPointer {
  pub entity_type:        String,
  pub source_system_name: String,
  pub source_system_id:   String,
}

impl fmt::Display for EntityPointer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}:{}:{}",
      self.entity_type, self.source_system_name, self.source_system_id
    )
  }
}

/// A pointer from one registry entry to another (e.g. establishment ↔
/// management group), with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
  pub entity_type:        String,
  pub source_system_name: String,
  pub source_system_id:   String,
  pub link_type:          String,
  pub linked_by:          String,
  pub linked_reason:      String,
  pub linked_at:          DateTime<Utc>,
}

// ─── Linked entity ───────────────────────────────────────────────────────────

/// One source system's contribution to a [`RegisteredEntity`].
///
/// The provenance fields (`link_type`, `linked_by`, `linked_reason`,
/// `linked_at`) are populated only when the entity was merged in via
/// cross-system matching rather than being the triggering change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedEntity {
  pub entity_type:        String,
  pub source_system_name: String,
  pub source_system_id:   String,
  pub name:               Option<String>,

  pub provider_type:      Option<String>,
  pub provider_sub_type:  Option<String>,
  pub status:             Option<String>,
  pub open_date:          Option<NaiveDate>,
  pub close_date:         Option<NaiveDate>,
  pub urn:                Option<i64>,
  pub ukprn:              Option<i64>,
  pub uprn:               Option<String>,
  pub companies_house_number:      Option<String>,
  pub charities_commission_number: Option<String>,
  pub academy_trust_code: Option<String>,
  pub dfe_number:         Option<String>,
  pub local_authority_code: Option<String>,

  pub management_group_type: Option<String>,
  pub management_group_id:   Option<String>,
  pub management_group_code: Option<String>,
  pub management_group_ukprn: Option<i64>,
  pub management_group_companies_house_number: Option<String>,

  pub link_type:     Option<String>,
  pub linked_by:     Option<String>,
  pub linked_reason: Option<String>,
  pub linked_at:     Option<DateTime<Utc>>,
}

impl LinkedEntity {
  pub fn pointer(&self) -> EntityPointer {
    EntityPointer {
      entity_type:        self.entity_type.clone(),
      source_system_name: self.source_system_name.clone(),
      source_system_id:   self.source_system_id.clone(),
    }
  }

  /// Whether provenance has already been recorded for this entity.
  pub fn has_provenance(&self) -> bool {
    self.linked_by.as_deref().is_some_and(|b| !b.is_empty())
  }
}

// ─── Registered entity ───────────────────────────────────────────────────────

/// Namespace for deterministic registry ids.
const ID_NAMESPACE: Uuid = Uuid::from_u128(0x2f1b_4c8e_9d3a_4e57_b06f_7a81_c5d2_e943);

/// One version of a unified registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredEntity {
  pub id:          Uuid,
  pub entity_type: String,
  pub valid_from:  NaiveDate,
  /// `None` means this is the current version.
  pub valid_to:    Option<NaiveDate>,
  pub entities:    Vec<LinkedEntity>,
  #[serde(default)]
  pub links:       Vec<Link>,
}

impl RegisteredEntity {
  /// Derive the id for a version from its triggering source identity and
  /// validity start. Stable across re-runs of the same day, so a partially
  /// processed day overwrites its own writes instead of duplicating them.
  pub fn deterministic_id(
    entity_type: &str,
    source_system_name: &str,
    source_system_id: &str,
    valid_from: NaiveDate,
  ) -> Uuid {
    let name = format!(
      "{entity_type}:{source_system_name}:{source_system_id}:{valid_from}"
    )
    .to_lowercase();
    Uuid::new_v5(&ID_NAMESPACE, name.as_bytes())
  }

  pub fn is_current(&self) -> bool { self.valid_to.is_none() }

  /// Partition/shard hint: the first available natural identifier among the
  /// contributing entities — URN, then UKPRN, then management-group code.
  pub fn partition_key(&self) -> Option<String> {
    if let Some(urn) = self.entities.iter().find_map(|e| e.urn) {
      return Some(urn.to_string());
    }
    if let Some(ukprn) = self.entities.iter().find_map(|e| e.ukprn) {
      return Some(ukprn.to_string());
    }
    self
      .entities
      .iter()
      .find_map(|e| e.management_group_code.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn deterministic_id_is_stable() {
    let a = RegisteredEntity::deterministic_id(
      entity_type::LEARNING_PROVIDER,
      source_system::GIAS,
      "100001",
      date("2024-01-05"),
    );
    let b = RegisteredEntity::deterministic_id(
      entity_type::LEARNING_PROVIDER,
      source_system::GIAS,
      "100001",
      date("2024-01-05"),
    );
    assert_eq!(a, b);
  }

  #[test]
  fn deterministic_id_varies_by_identity_and_date() {
    let base = RegisteredEntity::deterministic_id(
      entity_type::LEARNING_PROVIDER,
      source_system::GIAS,
      "100001",
      date("2024-01-05"),
    );
    let other_id = RegisteredEntity::deterministic_id(
      entity_type::LEARNING_PROVIDER,
      source_system::GIAS,
      "100002",
      date("2024-01-05"),
    );
    let other_day = RegisteredEntity::deterministic_id(
      entity_type::LEARNING_PROVIDER,
      source_system::GIAS,
      "100001",
      date("2024-01-06"),
    );
    assert_ne!(base, other_id);
    assert_ne!(base, other_day);
  }

  #[test]
  fn deterministic_id_ignores_case() {
    let upper = RegisteredEntity::deterministic_id(
      "management-group",
      "GIAS",
      "Trust-1234",
      date("2024-01-05"),
    );
    let lower = RegisteredEntity::deterministic_id(
      "management-group",
      "gias",
      "trust-1234",
      date("2024-01-05"),
    );
    assert_eq!(upper, lower);
  }

  #[test]
  fn partition_key_prefers_urn_then_ukprn_then_group_code() {
    let mut entity = RegisteredEntity {
      id:          Uuid::nil(),
      entity_type: entity_type::LEARNING_PROVIDER.into(),
      valid_from:  date("2024-01-05"),
      valid_to:    None,
      entities:    vec![
        LinkedEntity {
          management_group_code: Some("Trust-1".into()),
          ..LinkedEntity::default()
        },
        LinkedEntity {
          urn: Some(100001),
          ukprn: Some(10000001),
          ..LinkedEntity::default()
        },
      ],
      links:       vec![],
    };
    assert_eq!(entity.partition_key().as_deref(), Some("100001"));

    entity.entities[1].urn = None;
    assert_eq!(entity.partition_key().as_deref(), Some("10000001"));

    entity.entities[1].ukprn = None;
    assert_eq!(entity.partition_key().as_deref(), Some("Trust-1"));
  }
}
