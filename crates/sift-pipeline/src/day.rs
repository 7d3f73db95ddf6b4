//! One day's processing: change detection, registry resolution, flush,
//! statistics.

use std::{sync::Arc, time::Instant};

use chrono::NaiveDate;
use sift_core::{
  Result,
  cancel::CancelFlag,
  gias::GiasDayData,
  statistics::DateStatistics,
  store::{GiasStore, RegistryStore, StatisticsStore, Translator, UkrlpStore},
  ukrlp::UkrlpDayData,
};
use tracing::info;

use crate::{
  change::{GiasChangeProcessor, UkrlpChangeProcessor},
  resolve::RegistryResolver,
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Processes one day's extracts. The historical loop depends on this
/// abstraction, not on the concrete processor.
pub trait DayHandler: Send + Sync {
  async fn process_day(
    &self,
    date: NaiveDate,
    gias_day: &GiasDayData,
    ukrlp_day: &UkrlpDayData,
    cancel: &CancelFlag,
  ) -> Result<DateStatistics>;
}

// ─── Processor ───────────────────────────────────────────────────────────────

pub struct DayProcessor<G, U, R, T, S> {
  gias_changes:  GiasChangeProcessor<G>,
  ukrlp_changes: UkrlpChangeProcessor<U>,
  resolver:      RegistryResolver<R, G, T>,
  gias:          Arc<G>,
  ukrlp:         Arc<U>,
  registry:      Arc<R>,
  statistics:    Arc<S>,
}

impl<G, U, R, T, S> DayProcessor<G, U, R, T, S>
where
  G: GiasStore,
  U: UkrlpStore,
  R: RegistryStore,
  T: Translator,
  S: StatisticsStore,
{
  pub fn new(
    gias: Arc<G>,
    ukrlp: Arc<U>,
    registry: Arc<R>,
    translator: Arc<T>,
    statistics: Arc<S>,
  ) -> Self {
    Self {
      gias_changes: GiasChangeProcessor::new(Arc::clone(&gias)),
      ukrlp_changes: UkrlpChangeProcessor::new(Arc::clone(&ukrlp)),
      resolver: RegistryResolver::new(
        Arc::clone(&registry),
        Arc::clone(&gias),
        translator,
      ),
      gias,
      ukrlp,
      registry,
      statistics,
    }
  }
}

impl<G, U, R, T, S> DayHandler for DayProcessor<G, U, R, T, S>
where
  G: GiasStore,
  U: UkrlpStore,
  R: RegistryStore,
  T: Translator,
  S: StatisticsStore,
{
  async fn process_day(
    &self,
    date: NaiveDate,
    gias_day: &GiasDayData,
    ukrlp_day: &UkrlpDayData,
    cancel: &CancelFlag,
  ) -> Result<DateStatistics> {
    let started = Instant::now();

    let changed_establishments = self
      .gias_changes
      .establishment_deltas(
        &gias_day.establishments,
        &gias_day.group_links,
        date,
        cancel,
      )
      .await?;
    let changed_groups = self
      .gias_changes
      .group_deltas(&gias_day.groups, date, cancel)
      .await?;
    let changed_local_authorities = self
      .gias_changes
      .local_authority_deltas(&gias_day.local_authorities, date, cancel)
      .await?;
    let changed_providers = self
      .ukrlp_changes
      .provider_deltas(&ukrlp_day.providers, date, cancel)
      .await?;

    let touched = self
      .resolver
      .resolve(
        date,
        &changed_establishments,
        &changed_groups,
        &changed_local_authorities,
        &changed_providers,
        cancel,
      )
      .await?;

    let statistics = DateStatistics {
      date,
      duration: started.elapsed(),
      establishments_changed:    changed_establishments.len(),
      groups_changed:            changed_groups.len(),
      local_authorities_changed: changed_local_authorities.len(),
      providers_changed:         changed_providers.len(),
      registry_entries_changed:  touched.len(),
    };

    // A cancelled day is left unflushed and unrecorded: its payload writes
    // stay invisible and the whole day is re-processed on the next run.
    if cancel.is_cancelled() {
      info!(%date, "cancelled; day left unflushed");
      return Ok(statistics);
    }

    self.gias.flush().await?;
    self.ukrlp.flush().await?;
    self.registry.flush().await?;
    self.statistics.record(&statistics).await?;

    info!(
      %date,
      establishments = statistics.establishments_changed,
      groups = statistics.groups_changed,
      local_authorities = statistics.local_authorities_changed,
      providers = statistics.providers_changed,
      registry_entries = statistics.registry_entries_changed,
      "day processed"
    );

    Ok(statistics)
  }
}
