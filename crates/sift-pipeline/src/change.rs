//! Per-source change detection.
//!
//! For each record of a day's extract, in input order: look up the previous
//! snapshot; if absent or structurally changed, store the new snapshot at the
//! day's date and collect the record. Cancellation is polled once per record
//! and stops the loop without rolling back snapshots already stored.

use std::sync::Arc;

use chrono::NaiveDate;
use sift_core::{
  Result,
  cancel::CancelFlag,
  diff::Delta,
  gias::{CodeNamePair, Establishment, Group, GroupLink, LocalAuthority},
  store::{GiasStore, UkrlpStore},
  ukrlp::Provider,
};
use tracing::{debug, info};

// ─── Group-link annotation ───────────────────────────────────────────────────

const FEDERATION_GROUP_TYPE: &str = "Federation";
const TRUST_GROUP_TYPES: [&str; 3] =
  ["Trust", "Single-academy trust", "Multi-academy trust"];

/// Annotate an establishment with its federation and trust codes from the
/// day's group links: the first matching link of each family wins, and an
/// existing value is overwritten only when a link is found.
fn annotate_with_group_links(
  mut establishment: Establishment,
  group_links: &[GroupLink],
) -> Establishment {
  let links: Vec<&GroupLink> = group_links
    .iter()
    .filter(|link| link.urn == establishment.urn)
    .collect();

  let federation = links
    .iter()
    .find(|link| link.group_type.as_deref() == Some(FEDERATION_GROUP_TYPE));
  let trust = links.iter().find(|link| {
    link
      .group_type
      .as_deref()
      .is_some_and(|t| TRUST_GROUP_TYPES.contains(&t))
  });

  if let Some(link) = federation {
    establishment.federations = Some(CodeNamePair::from_code(link.uid.to_string()));
  }
  if let Some(link) = trust {
    establishment.trusts = Some(CodeNamePair::from_code(link.uid.to_string()));
  }

  establishment
}

// ─── GIAS ────────────────────────────────────────────────────────────────────

pub struct GiasChangeProcessor<G> {
  store: Arc<G>,
}

impl<G: GiasStore> GiasChangeProcessor<G> {
  pub fn new(store: Arc<G>) -> Self { Self { store } }

  /// Annotate each establishment with its group codes, then collect those
  /// that differ from their last stored snapshot, persisting new snapshots.
  pub async fn establishment_deltas(
    &self,
    establishments: &[Establishment],
    group_links: &[GroupLink],
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<Vec<Establishment>> {
    info!(%date, total = establishments.len(), "processing establishments for deltas");
    let mut changed = Vec::new();

    for (i, establishment) in establishments.iter().enumerate() {
      if cancel.is_cancelled() {
        break;
      }

      let establishment =
        annotate_with_group_links(establishment.clone(), group_links);

      let previous = self.store.establishment(establishment.urn, date).await?;
      let has_changed =
        previous.is_none_or(|previous| establishment.has_changed(&previous));

      if has_changed {
        info!(urn = establishment.urn, index = i, %date, "establishment changed; storing");
        self.store.store_establishment(&establishment, date).await?;
        changed.push(establishment);
      } else {
        debug!(urn = establishment.urn, index = i, %date, "establishment unchanged; skipping");
      }
    }

    Ok(changed)
  }

  pub async fn group_deltas(
    &self,
    groups: &[Group],
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<Vec<Group>> {
    info!(%date, total = groups.len(), "processing groups for deltas");
    let mut changed = Vec::new();

    for (i, group) in groups.iter().enumerate() {
      if cancel.is_cancelled() {
        break;
      }

      let previous = self.store.group(group.uid, date).await?;
      let has_changed = previous.is_none_or(|previous| group.has_changed(&previous));

      if has_changed {
        info!(uid = group.uid, index = i, %date, "group changed; storing");
        self.store.store_group(group, date).await?;
        changed.push(group.clone());
      } else {
        debug!(uid = group.uid, index = i, %date, "group unchanged; skipping");
      }
    }

    Ok(changed)
  }

  pub async fn local_authority_deltas(
    &self,
    local_authorities: &[LocalAuthority],
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<Vec<LocalAuthority>> {
    info!(%date, total = local_authorities.len(), "processing local authorities for deltas");
    let mut changed = Vec::new();

    for (i, local_authority) in local_authorities.iter().enumerate() {
      if cancel.is_cancelled() {
        break;
      }

      let previous = self.store.local_authority(local_authority.code, date).await?;
      let has_changed =
        previous.is_none_or(|previous| local_authority.has_changed(&previous));

      if has_changed {
        info!(la_code = local_authority.code, index = i, %date, "local authority changed; storing");
        self.store.store_local_authority(local_authority, date).await?;
        changed.push(local_authority.clone());
      } else {
        debug!(la_code = local_authority.code, index = i, %date, "local authority unchanged; skipping");
      }
    }

    Ok(changed)
  }
}

// ─── UKRLP ───────────────────────────────────────────────────────────────────

pub struct UkrlpChangeProcessor<U> {
  store: Arc<U>,
}

impl<U: UkrlpStore> UkrlpChangeProcessor<U> {
  pub fn new(store: Arc<U>) -> Self { Self { store } }

  pub async fn provider_deltas(
    &self,
    providers: &[Provider],
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<Vec<Provider>> {
    info!(%date, total = providers.len(), "processing providers for deltas");
    let mut changed = Vec::new();

    for (i, provider) in providers.iter().enumerate() {
      if cancel.is_cancelled() {
        break;
      }

      let previous = self.store.provider(provider.ukprn, date).await?;
      let has_changed = previous.is_none_or(|previous| provider.has_changed(&previous));

      if has_changed {
        info!(ukprn = provider.ukprn, index = i, %date, "provider changed; storing");
        self.store.store_provider(provider, date).await?;
        changed.push(provider.clone());
      } else {
        debug!(ukprn = provider.ukprn, index = i, %date, "provider unchanged; skipping");
      }
    }

    Ok(changed)
  }
}
