//! The day-by-day loop from the last checkpoint to an end date.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use sift_core::{
  Result,
  cancel::CancelFlag,
  store::{AppStateStore, GiasDaySource, UkrlpDaySource},
};
use tracing::info;

use crate::day::DayHandler;

pub struct HistoricalProcessor<A, GS, US, D> {
  app_state:  Arc<A>,
  gias_days:  Arc<GS>,
  ukrlp_days: Arc<US>,
  days:       D,
}

impl<A, GS, US, D> HistoricalProcessor<A, GS, US, D>
where
  A: AppStateStore,
  GS: GiasDaySource,
  US: UkrlpDaySource,
  D: DayHandler,
{
  pub fn new(app_state: Arc<A>, gias_days: Arc<GS>, ukrlp_days: Arc<US>, days: D) -> Self {
    Self { app_state, gias_days, ukrlp_days, days }
  }

  /// Process every unprocessed day up to `end_date` (default: today).
  ///
  /// The checkpoint advances only after a day fully completes, so a
  /// cancelled or failed day is re-processed from its start on the next
  /// run. Days are processed strictly in calendar order — the version
  /// stores rely on it.
  pub async fn run(&self, end_date: Option<NaiveDate>, cancel: &CancelFlag) -> Result<()> {
    let end_date = end_date.unwrap_or_else(|| Local::now().date_naive());
    info!(%end_date, "processing historical data");

    let last_processed = self.app_state.last_date_processed().await?;
    let mut date = last_processed.succ_opt().unwrap_or(NaiveDate::MAX);
    info!(start = %date, "resuming after last processed date");

    while date <= end_date && !cancel.is_cancelled() {
      info!(%date, "starting day");

      let gias_day = self.gias_days.day_data(date).await?;
      info!(
        establishments = gias_day.establishments.len(),
        groups = gias_day.groups.len(),
        group_links = gias_day.group_links.len(),
        local_authorities = gias_day.local_authorities.len(),
        "read GIAS day data"
      );
      let ukrlp_day = self.ukrlp_days.day_data(date).await?;
      info!(providers = ukrlp_day.providers.len(), "read UKRLP day data");

      let statistics = self
        .days
        .process_day(date, &gias_day, &ukrlp_day, cancel)
        .await?;

      if cancel.is_cancelled() {
        info!(%date, "cancelled mid-day; checkpoint not advanced");
        break;
      }

      self.app_state.set_last_date_processed(date).await?;
      info!(%date, duration = ?statistics.duration, "day complete; checkpoint advanced");

      date = date.succ_opt().unwrap_or(NaiveDate::MAX);
    }

    Ok(())
  }
}
