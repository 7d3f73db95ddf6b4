//! Core types and trait definitions for the sift entity-registry pipeline.
//!
//! This crate is deliberately free of I/O dependencies. The storage backend
//! (`sift-store-fs`) and the processing pipeline (`sift-pipeline`) both
//! depend on it; it depends on nothing heavier than serde.

// We intentionally use native `async fn` in traits. The pipeline is
// single-threaded and never spawns its futures, so the advisory lint about
// `Send` bounds on the returned futures does not apply.
#![allow(async_fn_in_trait)]

pub mod cancel;
pub mod diff;
pub mod error;
pub mod gias;
pub mod registry;
pub mod statistics;
pub mod store;
pub mod ukrlp;

pub use error::{Error, Result};
