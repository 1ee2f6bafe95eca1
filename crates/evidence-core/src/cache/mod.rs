//! Cache layer
//!
//! Durable SQLite store for resolved records and negative entries, plus the
//! per-identifier single-flight coalescer.

mod schema;
mod single_flight;
mod store;

pub use schema::Schema;
pub use single_flight::{Completion, SingleFlight};
pub use store::{CacheStore, NegativeEntry};
