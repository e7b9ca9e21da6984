//! Query execution for inventory-chat.
//!
//! Isolates SQL execution from the rest of the pipeline so it can be tested
//! on its own.

pub mod executor;

pub use executor::{QueryExecutor, QueryOutcome};
