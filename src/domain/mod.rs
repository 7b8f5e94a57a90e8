//! Core domain types and logic.

pub mod error;
pub mod offset_index;
pub mod record_codec;
pub mod store_config;
