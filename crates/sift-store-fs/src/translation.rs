//! [`FileTranslator`] — enum-value translation from a mappings file.
//!
//! The mappings file carries, per source system, per enumeration, the
//! canonical value and the source values it covers:
//!
//! ```json
//! {
//!   "GIAS": {
//!     "ManagementGroupType": {
//!       "Trust": ["Trust", "Single-academy trust", "Multi-academy trust"]
//!     }
//!   }
//! }
//! ```
//!
//! Tables are loaded once per run; every lookup resolves in memory.

use std::{collections::HashMap, io::ErrorKind, path::Path};

use sift_core::{Error, Result, store::Translator};

use crate::fsio::read_json_opt;

/// Canonical value → the source values it covers.
type EnumTable = HashMap<String, Vec<String>>;

/// Enumeration name → its table.
type SystemTable = HashMap<String, EnumTable>;

pub struct FileTranslator {
  systems: HashMap<String, SystemTable>,
}

impl FileTranslator {
  /// Load the mappings file. The file is required: nothing can be folded
  /// into the registry without translations.
  pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let systems = read_json_opt(path).await?.ok_or_else(|| {
      Error::Io(std::io::Error::new(
        ErrorKind::NotFound,
        format!("mappings file not found: {}", path.display()),
      ))
    })?;
    Ok(Self { systems })
  }

  /// Build directly from in-memory tables.
  pub fn from_mappings(systems: HashMap<String, SystemTable>) -> Self {
    Self { systems }
  }
}

impl Translator for FileTranslator {
  async fn translate(
    &self,
    enum_name: &str,
    source_system: &str,
    source_value: &str,
  ) -> Result<String> {
    let table = self
      .systems
      .iter()
      .find(|(name, _)| name.eq_ignore_ascii_case(source_system))
      .map(|(_, table)| table)
      .ok_or_else(|| Error::UnknownSourceSystem(source_system.into()))?;

    let mappings = table
      .iter()
      .find(|(name, _)| name.eq_ignore_ascii_case(enum_name))
      .map(|(_, mappings)| mappings)
      .ok_or_else(|| Error::UnknownEnum {
        enum_name:     enum_name.into(),
        source_system: source_system.into(),
      })?;

    for (canonical, source_values) in mappings {
      if source_values
        .iter()
        .any(|v| v.eq_ignore_ascii_case(source_value))
      {
        return Ok(canonical.clone());
      }
    }

    Err(Error::MissingTranslation {
      enum_name:     enum_name.into(),
      source_system: source_system.into(),
      source_value:  source_value.into(),
    })
  }
}
