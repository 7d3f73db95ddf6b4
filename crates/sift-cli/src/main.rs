//! `sift` — daily GIAS/UKRLP registry preparation pipeline.
//!
//! Reads captured day extracts from the data directory, detects changes
//! against the point-in-time stores, folds them into the unified registry,
//! and advances the checkpoint one fully processed day at a time.
//!
//! # Usage
//!
//! ```
//! sift --config sift.toml
//! sift --data-dir ./data --end-date 2024-01-31
//! ```
//!
//! Press Ctrl-C to stop: the in-flight day halts at the next record boundary
//! and is re-processed from its start on the next run.

mod stats;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::Parser;
use serde::Deserialize;
use sift_core::cancel::CancelFlag;
use sift_pipeline::{DayProcessor, HistoricalProcessor};
use sift_store_fs::{
  FileTranslator, FsAppStateStore, FsGiasDaySource, FsGiasStore,
  FsRegistryStore, FsStatisticsStore, FsUkrlpDaySource, FsUkrlpStore,
};
use stats::RecordingStatistics;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
  author,
  version,
  about = "Daily GIAS/UKRLP registry preparation pipeline"
)]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "sift.toml")]
  config: PathBuf,

  /// Directory holding day extracts, snapshots and indices. Overrides the
  /// config file.
  #[arg(long, env = "SIFT_DATA_DIR")]
  data_dir: Option<PathBuf>,

  /// Process up to this date instead of today (YYYY-MM-DD).
  #[arg(long)]
  end_date: Option<NaiveDate>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Runtime settings, layered from defaults, the TOML file and `SIFT_*`
/// environment variables.
#[derive(Deserialize, Clone)]
struct Settings {
  data_dir:      PathBuf,
  /// Enum-mapping tables; defaults to `{data_dir}/enum-mappings.json`.
  mappings_file: Option<PathBuf>,
  /// The day before the first captured extract; processing starts the day
  /// after it on a fresh data directory.
  initial_date:  NaiveDate,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .set_default("data_dir", "./data")
    .context("setting default data_dir")?
    .set_default("initial_date", "2016-08-31")
    .context("setting default initial_date")?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SIFT"))
    .build()
    .context("failed to read configuration")?;
  let mut settings: Settings = settings
    .try_deserialize()
    .context("failed to deserialise settings")?;

  if let Some(data_dir) = cli.data_dir {
    settings.data_dir = data_dir;
  }
  let mappings_file = settings
    .mappings_file
    .clone()
    .unwrap_or_else(|| settings.data_dir.join("enum-mappings.json"));

  // Stores and collaborators.
  let gias = Arc::new(
    FsGiasStore::open(&settings.data_dir)
      .await
      .context("opening GIAS snapshot store")?,
  );
  let ukrlp = Arc::new(
    FsUkrlpStore::open(&settings.data_dir)
      .await
      .context("opening UKRLP snapshot store")?,
  );
  let registry = Arc::new(
    FsRegistryStore::open(&settings.data_dir)
      .await
      .context("opening registry store")?,
  );
  let translator = Arc::new(
    FileTranslator::load(&mappings_file)
      .await
      .with_context(|| format!("loading enum mappings from {}", mappings_file.display()))?,
  );
  let statistics = Arc::new(RecordingStatistics::new(FsStatisticsStore::new(
    &settings.data_dir,
  )));
  let app_state = Arc::new(FsAppStateStore::new(
    &settings.data_dir,
    settings.initial_date,
  ));
  let gias_days = Arc::new(FsGiasDaySource::new(&settings.data_dir));
  let ukrlp_days = Arc::new(FsUkrlpDaySource::new(&settings.data_dir));

  let day_processor = DayProcessor::new(
    gias,
    ukrlp,
    registry,
    translator,
    Arc::clone(&statistics),
  );
  let processor =
    HistoricalProcessor::new(app_state, gias_days, ukrlp_days, day_processor);

  // Ctrl-C requests cooperative cancellation; writes already committed for
  // the in-flight day are kept, the checkpoint is not advanced.
  let cancel = CancelFlag::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested; finishing current record");
        cancel.cancel();
      }
    });
  }

  processor
    .run(cli.end_date, &cancel)
    .await
    .context("processing historical data")?;

  // End-of-run report.
  let days = statistics.days().await;
  tracing::info!(
    days = days.len(),
    total_duration = ?statistics.total_duration().await,
    "run complete"
  );
  for day in &days {
    tracing::info!(
      date = %day.date,
      duration = ?day.duration,
      establishments = day.establishments_changed,
      groups = day.groups_changed,
      local_authorities = day.local_authorities_changed,
      providers = day.providers_changed,
      registry_entries = day.registry_entries_changed,
      "day summary"
    );
  }

  Ok(())
}
