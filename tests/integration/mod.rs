//! Integration tests for inventory-chat.

pub mod api_test;
pub mod common;
pub mod connection_test;
pub mod llm_client_test;
pub mod pipeline_test;
pub mod setup_test;
