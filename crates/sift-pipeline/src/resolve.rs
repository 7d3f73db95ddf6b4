//! Registry resolution: fold a day's changed source records into the
//! unified, time-versioned registry.
//!
//! Three passes, in an order that must be preserved: management groups first
//! (establishments link against them), then establishments, then providers.
//! Closing a version and creating its replacement are separate writes; the
//! replacement is a new id derived deterministically from the triggering
//! source identity and the day, so re-running a day overwrites rather than
//! duplicates.

use std::{collections::HashMap, sync::Arc};

use chrono::{NaiveDate, Utc};
use sift_core::{
  Error, Result,
  cancel::CancelFlag,
  gias::{Establishment, Group, LocalAuthority},
  registry::{
    Link, LinkedEntity, RegisteredEntity, entity_type, link_type, source_system,
  },
  store::{GiasStore, RegistryStore, Translator, enumeration},
  ukrlp::{Provider, authority},
};
use tracing::info;
use uuid::Uuid;

const LINKED_BY: &str = "sift";
const REASON_MANAGEMENT_GROUP_CODE: &str = "Matching management group code";
const REASON_MATCHING_UKPRN: &str = "Matching UKPRN";
const REASON_MATCHING_URN: &str = "Matching URN";

// ─── Resolver ────────────────────────────────────────────────────────────────

pub struct RegistryResolver<R, G, T> {
  registry:   Arc<R>,
  gias:       Arc<G>,
  translator: Arc<T>,
}

impl<R, G, T> RegistryResolver<R, G, T>
where
  R: RegistryStore,
  G: GiasStore,
  T: Translator,
{
  pub fn new(registry: Arc<R>, gias: Arc<G>, translator: Arc<T>) -> Self {
    Self { registry, gias, translator }
  }

  /// Fold the day's changed records into the registry and return every
  /// touched version, deduplicated by id keeping the last write per id.
  pub async fn resolve(
    &self,
    date: NaiveDate,
    changed_establishments: &[Establishment],
    changed_groups: &[Group],
    changed_local_authorities: &[LocalAuthority],
    changed_providers: &[Provider],
    cancel: &CancelFlag,
  ) -> Result<Vec<RegisteredEntity>> {
    let mut touched = Vec::new();

    self
      .management_group_changes(
        &mut touched,
        changed_groups,
        changed_local_authorities,
        date,
        cancel,
      )
      .await?;
    self
      .establishment_changes(&mut touched, changed_establishments, date, cancel)
      .await?;
    self
      .provider_changes(&mut touched, changed_providers, date, cancel)
      .await?;

    Ok(dedup_keep_last(touched))
  }

  // ── Pass 1: management groups ─────────────────────────────────────────────

  async fn management_group_changes(
    &self,
    touched: &mut Vec<RegisteredEntity>,
    changed_groups: &[Group],
    changed_local_authorities: &[LocalAuthority],
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<()> {
    let mut entities = Vec::new();
    for group in changed_groups {
      entities.push(self.map_group(group).await?);
    }
    for local_authority in changed_local_authorities {
      entities.push(self.map_local_authority(local_authority).await?);
    }

    let total = entities.len();
    for (i, entity) in entities.into_iter().enumerate() {
      if cancel.is_cancelled() {
        break;
      }

      let previous = self
        .registry
        .registered_entity(
          &entity.entity_type,
          &entity.source_system_name,
          &entity.source_system_id,
          date,
        )
        .await?;
      let change_kind = if previous.is_some() { "updated" } else { "new" };

      let latest = RegisteredEntity {
        id: RegisteredEntity::deterministic_id(
          &entity.entity_type,
          &entity.source_system_name,
          &entity.source_system_id,
          date,
        ),
        entity_type: entity.entity_type.clone(),
        valid_from: date,
        valid_to: None,
        links: previous
          .as_ref()
          .map(|p| p.links.clone())
          .unwrap_or_default(),
        entities: vec![entity],
      };

      if let Some(mut previous) = previous {
        previous.valid_to = Some(date);
        self.registry.store(&previous, date).await?;
        touched.push(previous);
      }

      self.registry.store(&latest, date).await?;
      info!(
        index = i,
        total,
        id = %latest.entities[0].source_system_id,
        change = change_kind,
        "stored management group in registry"
      );
      touched.push(latest);
    }

    Ok(())
  }

  // ── Pass 2: establishments ────────────────────────────────────────────────

  async fn establishment_changes(
    &self,
    touched: &mut Vec<RegisteredEntity>,
    changed_establishments: &[Establishment],
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<()> {
    for (i, establishment) in changed_establishments.iter().enumerate() {
      if cancel.is_cancelled() {
        break;
      }

      let entity = self.map_establishment(establishment, date).await?;
      let management_group_code = entity.management_group_code.clone();
      let previous = self
        .registry
        .registered_entity(
          &entity.entity_type,
          &entity.source_system_name,
          &entity.source_system_id,
          date,
        )
        .await?;
      let change_kind = if previous.is_some() { "updated" } else { "new" };

      let mut latest = RegisteredEntity {
        id: RegisteredEntity::deterministic_id(
          &entity.entity_type,
          &entity.source_system_name,
          &entity.source_system_id,
          date,
        ),
        entity_type: entity.entity_type.clone(),
        valid_from: date,
        valid_to: None,
        entities: vec![entity],
        links: vec![],
      };

      if let Some(mut previous) = previous {
        previous.valid_to = Some(date);
        self.registry.store(&previous, date).await?;

        // Carry forward the other systems' entities and the links; the stale
        // entry for the triggering system is replaced by the new one.
        let triggering_system = latest.entities[0].source_system_name.clone();
        latest.entities.extend(
          previous
            .entities
            .iter()
            .filter(|e| e.source_system_name != triggering_system)
            .cloned(),
        );
        latest.links = previous.links.clone();
        touched.push(previous);
      } else if let Some(code) = management_group_code.as_deref() {
        // First sighting: link to the management group, both ways.
        let management_group = self
          .registry
          .registered_entity(
            entity_type::MANAGEMENT_GROUP,
            source_system::GIAS,
            code,
            date,
          )
          .await?;
        if let Some(mut management_group) = management_group {
          management_group.links.push(Link {
            entity_type:        latest.entities[0].entity_type.clone(),
            source_system_name: latest.entities[0].source_system_name.clone(),
            source_system_id:   latest.entities[0].source_system_id.clone(),
            link_type:          link_type::MANAGEMENT_GROUP.into(),
            linked_by:          LINKED_BY.into(),
            linked_reason:      REASON_MANAGEMENT_GROUP_CODE.into(),
            linked_at:          Utc::now(),
          });
          self.registry.store(&management_group, date).await?;
          touched.push(management_group);

          latest.links = vec![Link {
            entity_type:        entity_type::MANAGEMENT_GROUP.into(),
            source_system_name: source_system::GIAS.into(),
            source_system_id:   code.into(),
            link_type:          link_type::MANAGEMENT_GROUP.into(),
            linked_by:          LINKED_BY.into(),
            linked_reason:      REASON_MANAGEMENT_GROUP_CODE.into(),
            linked_at:          Utc::now(),
          }];
        }
      }

      if latest.entities.len() == 1
        && let Some(ukprn) = establishment.ukprn
      {
        self
          .merge_cross_system_entity(
            &mut latest,
            source_system::UKRLP,
            &ukprn.to_string(),
            REASON_MATCHING_UKPRN,
            date,
          )
          .await?;
      }

      self.registry.store(&latest, date).await?;
      info!(
        index = i,
        total = changed_establishments.len(),
        id = %latest.entities[0].source_system_id,
        change = change_kind,
        "stored establishment in registry"
      );
      touched.push(latest);
    }

    Ok(())
  }

  // ── Pass 3: providers ─────────────────────────────────────────────────────

  async fn provider_changes(
    &self,
    touched: &mut Vec<RegisteredEntity>,
    changed_providers: &[Provider],
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<()> {
    for (i, provider) in changed_providers.iter().enumerate() {
      if cancel.is_cancelled() {
        break;
      }

      let entity = self.map_provider(provider).await?;
      let urn = entity.urn;
      let previous = self
        .registry
        .registered_entity(
          &entity.entity_type,
          &entity.source_system_name,
          &entity.source_system_id,
          date,
        )
        .await?;
      let change_kind = if previous.is_some() { "updated" } else { "new" };

      let mut latest = RegisteredEntity {
        id: RegisteredEntity::deterministic_id(
          &entity.entity_type,
          &entity.source_system_name,
          &entity.source_system_id,
          date,
        ),
        entity_type: entity.entity_type.clone(),
        valid_from: date,
        valid_to: None,
        entities: vec![entity],
        links: vec![],
      };

      if let Some(mut previous) = previous {
        previous.valid_to = Some(date);
        self.registry.store(&previous, date).await?;

        let triggering_system = latest.entities[0].source_system_name.clone();
        latest.entities.extend(
          previous
            .entities
            .iter()
            .filter(|e| e.source_system_name != triggering_system)
            .cloned(),
        );
        latest.links = previous.links.clone();
        touched.push(previous);

        self.registry.store(&latest, date).await?;
        touched.push(latest.clone());
      }

      if latest.entities.len() == 1
        && let Some(urn) = urn
      {
        self
          .merge_cross_system_entity(
            &mut latest,
            source_system::GIAS,
            &urn.to_string(),
            REASON_MATCHING_URN,
            date,
          )
          .await?;
      }

      self.registry.store(&latest, date).await?;
      info!(
        index = i,
        total = changed_providers.len(),
        id = %latest.entities[0].source_system_id,
        change = change_kind,
        "stored provider in registry"
      );
      touched.push(latest);
    }

    Ok(())
  }

  // ── Cross-system merge ────────────────────────────────────────────────────

  /// Absorb the counterpart learning-provider entity from `other_system`
  /// into `latest`. A counterpart first created this same day is deleted
  /// outright (its identity is absorbed, no separate history needed);
  /// otherwise it is closed. Every merged entity lacking provenance is
  /// tagged as a synonym with `reason`.
  async fn merge_cross_system_entity(
    &self,
    latest: &mut RegisteredEntity,
    other_system: &str,
    other_id: &str,
    reason: &str,
    date: NaiveDate,
  ) -> Result<()> {
    let counterpart = self
      .registry
      .registered_entity(entity_type::LEARNING_PROVIDER, other_system, other_id, date)
      .await?;
    let Some(mut counterpart) = counterpart else {
      return Ok(());
    };

    if counterpart.valid_from == date {
      self.registry.delete(counterpart.id).await?;
    } else {
      counterpart.valid_to = Some(date);
      self.registry.store(&counterpart, date).await?;
    }

    latest.entities.extend(counterpart.entities);
    for linked in &mut latest.entities {
      if !linked.has_provenance() {
        linked.linked_at = Some(Utc::now());
        linked.linked_by = Some(LINKED_BY.into());
        linked.linked_reason = Some(reason.into());
        linked.link_type = Some(link_type::SYNONYM.into());
      }
    }

    Ok(())
  }

  // ── Source → linked-entity mapping ────────────────────────────────────────

  async fn map_group(&self, group: &Group) -> Result<LinkedEntity> {
    let group_type = group.group_type.as_deref().ok_or_else(|| {
      Error::MalformedSource(format!("group {} has no group type", group.uid))
    })?;
    let translated_group_type = self
      .translator
      .translate(
        enumeration::MANAGEMENT_GROUP_TYPE,
        source_system::GIAS,
        group_type,
      )
      .await?;
    let code = format!("{translated_group_type}-{}", group.uid);

    Ok(LinkedEntity {
      entity_type:        entity_type::MANAGEMENT_GROUP.into(),
      source_system_name: source_system::GIAS.into(),
      source_system_id:   code.clone(),
      name:               group.group_name.clone(),
      management_group_type: Some(translated_group_type),
      management_group_code: Some(code),
      management_group_id: Some(group.uid.to_string()),
      management_group_ukprn: group.ukprn,
      management_group_companies_house_number: group.companies_house_number.clone(),
      ..LinkedEntity::default()
    })
  }

  async fn map_local_authority(
    &self,
    local_authority: &LocalAuthority,
  ) -> Result<LinkedEntity> {
    let translated_group_type = self
      .translator
      .translate(
        enumeration::MANAGEMENT_GROUP_TYPE,
        source_system::GIAS,
        LocalAuthority::MANAGEMENT_GROUP_TYPE,
      )
      .await?;
    let code = format!("{translated_group_type}-{}", local_authority.code);

    Ok(LinkedEntity {
      entity_type:        entity_type::MANAGEMENT_GROUP.into(),
      source_system_name: source_system::GIAS.into(),
      source_system_id:   code.clone(),
      name:               local_authority.name.clone(),
      management_group_type: Some(translated_group_type),
      management_group_code: Some(code),
      management_group_id: Some(local_authority.code.to_string()),
      ..LinkedEntity::default()
    })
  }

  async fn map_provider(&self, provider: &Provider) -> Result<LinkedEntity> {
    let status = provider.provider_status.as_deref().ok_or_else(|| {
      Error::MalformedSource(format!("provider {} has no status", provider.ukprn))
    })?;
    let translated_status = self
      .translator
      .translate(enumeration::PROVIDER_STATUS, source_system::UKRLP, status)
      .await?;

    let urn_verification = provider.verification(authority::URN);
    let urn = urn_verification
      .map(|v| {
        v.id.parse::<i64>().map_err(|_| {
          Error::MalformedSource(format!(
            "provider {} has non-numeric verified URN {:?}",
            provider.ukprn, v.id
          ))
        })
      })
      .transpose()?;

    Ok(LinkedEntity {
      entity_type:        entity_type::LEARNING_PROVIDER.into(),
      source_system_name: source_system::UKRLP.into(),
      source_system_id:   provider.ukprn.to_string(),
      name:               provider.provider_name.clone(),
      status:             Some(translated_status),
      urn,
      ukprn:              Some(provider.ukprn),
      companies_house_number: provider
        .verification(authority::COMPANIES_HOUSE)
        .map(|v| v.id.clone()),
      charities_commission_number: provider
        .verification(authority::CHARITY_COMMISSION)
        .map(|v| v.id.clone()),
      dfe_number:         urn_verification.map(|v| v.id.clone()),
      ..LinkedEntity::default()
    })
  }

  async fn map_establishment(
    &self,
    establishment: &Establishment,
    date: NaiveDate,
  ) -> Result<LinkedEntity> {
    let type_group = required_code(
      &establishment.establishment_type_group,
      establishment.urn,
      "establishment type group",
    )?;
    let establishment_type = required_code(
      &establishment.type_of_establishment,
      establishment.urn,
      "type of establishment",
    )?;
    let status = required_code(
      &establishment.establishment_status,
      establishment.urn,
      "establishment status",
    )?;
    let la_code = required_code(&establishment.la, establishment.urn, "LA")?;

    let translated_type = self
      .translator
      .translate(enumeration::PROVIDER_TYPE, source_system::GIAS, type_group)
      .await?;
    let translated_sub_type = self
      .translator
      .translate(
        enumeration::PROVIDER_SUB_TYPE,
        source_system::GIAS,
        establishment_type,
      )
      .await?;
    let translated_status = self
      .translator
      .translate(enumeration::PROVIDER_STATUS, source_system::GIAS, status)
      .await?;

    let mut entity = LinkedEntity {
      entity_type:        entity_type::LEARNING_PROVIDER.into(),
      source_system_name: source_system::GIAS.into(),
      source_system_id:   establishment.urn.to_string(),
      name:               establishment.establishment_name.clone(),
      provider_type:      Some(translated_type),
      provider_sub_type:  Some(translated_sub_type),
      status:             Some(translated_status),
      open_date:          establishment.open_date,
      close_date:         establishment.close_date,
      urn:                Some(establishment.urn),
      ukprn:              establishment.ukprn,
      uprn:               establishment.uprn.clone(),
      companies_house_number: establishment.companies_house_number.clone(),
      charities_commission_number: establishment
        .charities_commission_number
        .clone(),
      academy_trust_code: establishment
        .trusts
        .as_ref()
        .and_then(|t| t.code.clone()),
      dfe_number:         Some(format!(
        "{la_code}/{}",
        establishment
          .establishment_number
          .map(|n| n.to_string())
          .unwrap_or_default()
      )),
      local_authority_code: Some(la_code.to_string()),
      ..LinkedEntity::default()
    };

    // Management-group details: the trusts group wins, then federations,
    // then the LA itself.
    let group = match self.group_code(&establishment.trusts, establishment.urn)? {
      Some(uid) => self.gias.group(uid, date).await?,
      None => None,
    };
    let group = match group {
      None => {
        match self.group_code(&establishment.federations, establishment.urn)? {
          Some(uid) => self.gias.group(uid, date).await?,
          None => None,
        }
      }
      found => found,
    };

    if let Some(group) = group {
      let group_type = group.group_type.as_deref().ok_or_else(|| {
        Error::MalformedSource(format!("group {} has no group type", group.uid))
      })?;
      let translated_group_type = self
        .translator
        .translate(
          enumeration::MANAGEMENT_GROUP_TYPE,
          source_system::GIAS,
          group_type,
        )
        .await?;

      entity.management_group_code =
        Some(format!("{translated_group_type}-{}", group.uid));
      entity.management_group_type = Some(translated_group_type);
      entity.management_group_id = Some(group.uid.to_string());
      entity.management_group_ukprn = group.ukprn;
      entity.management_group_companies_house_number = group.companies_house_number;
    } else {
      let translated_group_type = self
        .translator
        .translate(
          enumeration::MANAGEMENT_GROUP_TYPE,
          source_system::GIAS,
          LocalAuthority::MANAGEMENT_GROUP_TYPE,
        )
        .await?;

      entity.management_group_code =
        Some(format!("{translated_group_type}-{la_code}"));
      entity.management_group_type = Some(translated_group_type);
      entity.management_group_id = Some(la_code.to_string());
    }

    Ok(entity)
  }

  /// The group UID carried in a trusts/federations code pair, if present.
  fn group_code(
    &self,
    pair: &Option<sift_core::gias::CodeNamePair>,
    urn: i64,
  ) -> Result<Option<i64>> {
    let Some(code) = pair.as_ref().and_then(|p| p.code.as_deref()) else {
      return Ok(None);
    };
    if code.is_empty() {
      return Ok(None);
    }
    code.parse().map(Some).map_err(|_| {
      Error::MalformedSource(format!(
        "establishment {urn} has non-numeric group code {code:?}"
      ))
    })
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn required_code<'a>(
  pair: &'a Option<sift_core::gias::CodeNamePair>,
  urn: i64,
  field: &str,
) -> Result<&'a str> {
  pair
    .as_ref()
    .and_then(|p| p.code.as_deref())
    .ok_or_else(|| {
      Error::MalformedSource(format!("establishment {urn} has no {field} code"))
    })
}

/// Deduplicate by id, keeping the last write per id. Output order follows
/// each id's first appearance.
fn dedup_keep_last(entities: Vec<RegisteredEntity>) -> Vec<RegisteredEntity> {
  let mut position: HashMap<Uuid, usize> = HashMap::new();
  let mut result: Vec<RegisteredEntity> = Vec::new();

  for entity in entities {
    match position.get(&entity.id) {
      Some(&i) => result[i] = entity,
      None => {
        position.insert(entity.id, result.len());
        result.push(entity);
      }
    }
  }

  result
}
