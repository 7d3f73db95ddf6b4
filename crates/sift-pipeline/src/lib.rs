//! The sift processing pipeline.
//!
//! One day at a time: the change processors diff the day's extracts against
//! the point-in-time stores, the resolver folds the changed records into the
//! registry, and the historical loop drives day after day from the last
//! checkpoint. Everything is generic over the collaborator traits in
//! [`sift_core::store`].

// Native `async fn` in traits, as in sift-core: the pipeline never spawns
// its futures.
#![allow(async_fn_in_trait)]

pub mod change;
pub mod day;
pub mod historical;
pub mod resolve;

pub use change::{GiasChangeProcessor, UkrlpChangeProcessor};
pub use day::{DayHandler, DayProcessor};
pub use historical::HistoricalProcessor;
pub use resolve::RegistryResolver;
