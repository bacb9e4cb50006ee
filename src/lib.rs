//! Breed Match - dog breed recommendation service
//!
//! Turns questionnaire answers into search constraints, walks a ladder of
//! progressively relaxed filters over a vector index of breed metadata and
//! explains the single best match.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{build_filter, build_tiers, select_best, BreedMatcher, MatchError};
pub use models::{BreedRecord, PreferenceConstraints, Recommendation, SearchHit};
