//! Error types for `sift-core`.
//!
//! One enum is shared by every collaborator trait: the pipeline composes
//! eight collaborators, and a missing snapshot or registry entry is modelled
//! as `Option`, never as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialization error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date parse error: {0}")]
  DateParse(#[from] chrono::ParseError),

  /// A source record that cannot be resolved (missing or unparsable natural
  /// identifier). Aborts the current day.
  #[error("malformed source record: {0}")]
  MalformedSource(String),

  /// Stored content that no longer matches its index.
  #[error("corrupt store content at {path}: {detail}")]
  Corrupt { path: String, detail: String },

  #[error("{source_system} does not translate enum {enum_name}")]
  UnknownEnum {
    enum_name:     String,
    source_system: String,
  },

  #[error("unsupported source system for translation: {0}")]
  UnknownSourceSystem(String),

  /// A source value with no canonical mapping. Fatal: the record cannot be
  /// folded into the registry without one.
  #[error("enum {enum_name} for {source_system} has no mapping for {source_value:?}")]
  MissingTranslation {
    enum_name:     String,
    source_system: String,
    source_value:  String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
