//! Filesystem backend for the sift collaborator traits.
//!
//! One directory tree per data set: snapshot payloads are single JSON objects
//! named `{prefix}-{key}-{yyyymmdd}.json`, immutable once written; version
//! indices live beside them and are rewritten only on
//! [`flush`](sift_core::store::GiasStore::flush). All file I/O goes through
//! [`tokio::fs`] so the pipeline's runtime is never blocked.

mod fsio;
mod version_index;

pub mod app_state;
pub mod day_data;
pub mod gias;
pub mod registry;
pub mod statistics;
pub mod translation;
pub mod ukrlp;

pub use app_state::FsAppStateStore;
pub use day_data::{FsGiasDaySource, FsUkrlpDaySource};
pub use gias::FsGiasStore;
pub use registry::FsRegistryStore;
pub use statistics::FsStatisticsStore;
pub use translation::FileTranslator;
pub use ukrlp::FsUkrlpStore;
pub use version_index::VersionIndex;

#[cfg(test)]
mod tests;
