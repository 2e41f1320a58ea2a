//! Shared utilities: error classification, retry with jitter, defensive
//! JSON extraction.

pub mod error;
pub mod json;
pub mod retry;
