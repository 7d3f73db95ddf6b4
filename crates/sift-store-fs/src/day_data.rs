//! Day-extract sources reading captured JSON day files.
//!
//! Wire-level capture of the vendor feeds happens upstream; this module only
//! reads what was captured. A missing day file means no extract was
//! published for that date and yields an empty day.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sift_core::{
  Result,
  gias::{GiasDayData, local_authorities_from_establishments},
  store::{GiasDaySource, UkrlpDaySource},
  ukrlp::UkrlpDayData,
};

use crate::fsio::read_json_opt;

/// Reads `{data_dir}/days/gias-{yyyymmdd}.json`.
///
/// GIAS publishes no standalone local-authority list; when the day file
/// omits one it is derived from the establishments.
pub struct FsGiasDaySource {
  dir: PathBuf,
}

impl FsGiasDaySource {
  pub fn new(data_dir: impl AsRef<Path>) -> Self {
    Self { dir: data_dir.as_ref().join("days") }
  }
}

impl GiasDaySource for FsGiasDaySource {
  async fn day_data(&self, date: NaiveDate) -> Result<GiasDayData> {
    let path = self.dir.join(format!("gias-{}.json", date.format("%Y%m%d")));
    let Some(mut day) = read_json_opt::<GiasDayData>(&path).await? else {
      return Ok(GiasDayData::default());
    };

    if day.local_authorities.is_empty() {
      day.local_authorities =
        local_authorities_from_establishments(&day.establishments)?;
    }

    Ok(day)
  }
}

/// Reads `{data_dir}/days/ukrlp-{yyyymmdd}.json`.
pub struct FsUkrlpDaySource {
  dir: PathBuf,
}

impl FsUkrlpDaySource {
  pub fn new(data_dir: impl AsRef<Path>) -> Self {
    Self { dir: data_dir.as_ref().join("days") }
  }
}

impl UkrlpDaySource for FsUkrlpDaySource {
  async fn day_data(&self, date: NaiveDate) -> Result<UkrlpDayData> {
    let path = self.dir.join(format!("ukrlp-{}.json", date.format("%Y%m%d")));
    Ok(read_json_opt(&path).await?.unwrap_or_default())
  }
}
