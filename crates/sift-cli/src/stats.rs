//! In-process statistics accumulator for the end-of-run report.

use std::time::Duration;

use sift_core::{Result, statistics::DateStatistics, store::StatisticsStore};
use tokio::sync::Mutex;

/// Decorates a persistent statistics sink, additionally keeping every day's
/// statistics in memory so the run can be summarised at exit.
pub struct RecordingStatistics<S> {
  inner: S,
  days:  Mutex<Vec<DateStatistics>>,
}

impl<S> RecordingStatistics<S> {
  pub fn new(inner: S) -> Self {
    Self { inner, days: Mutex::new(Vec::new()) }
  }

  /// Every day recorded during this run, in processing order.
  pub async fn days(&self) -> Vec<DateStatistics> {
    self.days.lock().await.clone()
  }

  pub async fn total_duration(&self) -> Duration {
    self.days.lock().await.iter().map(|d| d.duration).sum()
  }
}

impl<S: StatisticsStore> StatisticsStore for RecordingStatistics<S> {
  async fn record(&self, statistics: &DateStatistics) -> Result<()> {
    self.days.lock().await.push(statistics.clone());
    self.inner.record(statistics).await
  }
}
