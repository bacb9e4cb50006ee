// Core algorithm exports
pub mod constraints;
pub mod filters;
pub mod matcher;
pub mod scoring;
pub mod selection;
pub mod tiers;

pub use constraints::{ConstraintError, RawFilterParameters};
pub use filters::{build_filter, Clause, FilterExpression};
pub use matcher::{BestMatch, BreedMatcher, MatchError, MatcherSettings};
pub use scoring::{build_recommendation, explain, match_score};
pub use selection::select_best;
pub use tiers::{build_tiers, plan_attempts, popularity_caps, SearchAttempt};
