//! Topic discovery engine: clustering, stance splitting, scoring, summary
//! generation, result caching, rotation, and navigation mode.

pub mod cache;
pub mod clustering;
pub mod navigation;
pub mod orchestrator;
pub mod rotation;
pub mod scoring;
pub mod stance;
pub mod summary;
pub mod types;
