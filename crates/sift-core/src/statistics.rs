//! Per-day processing statistics.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What one processed day changed, and how long it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateStatistics {
  pub date:     NaiveDate,
  pub duration: Duration,

  pub establishments_changed:    usize,
  pub groups_changed:            usize,
  pub local_authorities_changed: usize,
  pub providers_changed:         usize,
  pub registry_entries_changed:  usize,
}
