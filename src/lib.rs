//! inventory-chat - natural-language questions over an inventory database.
//!
//! A question is turned into SQL by a language model, executed against the
//! store, and the rows are summarized back into prose.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod setup;
