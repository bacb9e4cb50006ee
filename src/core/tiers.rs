use crate::core::filters::{build_filter, FilterExpression};
use crate::models::PreferenceConstraints;

/// Number of filter tiers produced for every constraint set
pub const TIER_COUNT: usize = 5;

/// Default popularity caps, most popular first. `None` means no cap.
pub const DEFAULT_POPULARITY_CAPS: [Option<u32>; 4] = [Some(50), Some(100), Some(150), None];

/// Build progressively relaxed filters, most restrictive first
///
/// # Tiers
/// 1. Every applicable clause
/// 2. Without temperament tags (exact tag matches empty results most often)
/// 3. Numeric clauses only: energy, shedding, grooming, weight, trainability, popularity
/// 4. Essential clauses only: weight, trainability, popularity
/// 5. No filter (plain semantic search)
///
/// Always returns exactly `TIER_COUNT` entries. Tiers that render the same
/// filter as a neighbour are kept so tier positions stay stable.
pub fn build_tiers(constraints: &PreferenceConstraints) -> Vec<Option<FilterExpression>> {
    let without_temperament = PreferenceConstraints {
        temperament_tags: Vec::new(),
        ..constraints.clone()
    };

    let numeric = PreferenceConstraints {
        search_query: constraints.search_query.clone(),
        temperament_tags: Vec::new(),
        energy_min_value: constraints.energy_min_value,
        energy_max_value: constraints.energy_max_value,
        shedding_max_value: constraints.shedding_max_value,
        grooming_max_value: constraints.grooming_max_value,
        weight_min_kg: constraints.weight_min_kg,
        weight_max_kg: constraints.weight_max_kg,
        min_trainability_value: constraints.min_trainability_value,
        popularity_max_rank: constraints.popularity_max_rank,
    };

    let essential = PreferenceConstraints {
        search_query: constraints.search_query.clone(),
        weight_min_kg: constraints.weight_min_kg,
        weight_max_kg: constraints.weight_max_kg,
        min_trainability_value: constraints.min_trainability_value,
        popularity_max_rank: constraints.popularity_max_rank,
        ..Default::default()
    };

    vec![
        build_filter(constraints),
        build_filter(&without_temperament),
        build_filter(&numeric),
        build_filter(&essential),
        None,
    ]
}

/// Normalize configured caps: keep positive caps in order and always end with "any"
pub fn popularity_caps(configured: &[u32]) -> Vec<Option<u32>> {
    configured
        .iter()
        .copied()
        .filter(|cap| *cap > 0)
        .map(Some)
        .chain(std::iter::once(None))
        .collect()
}

/// One planned search: a popularity cap and one of its filter tiers
#[derive(Debug, Clone, PartialEq)]
pub struct SearchAttempt {
    pub cap: Option<u32>,
    /// 1-based tier position within the cap
    pub tier: usize,
    pub filter: Option<FilterExpression>,
}

/// Flatten caps × tiers into the ordered list of searches to try
///
/// Caps widen in the outer loop, tiers relax in the inner loop.
pub fn plan_attempts(
    constraints: &PreferenceConstraints,
    caps: &[Option<u32>],
) -> Vec<SearchAttempt> {
    caps.iter()
        .flat_map(|cap| {
            build_tiers(&constraints.with_popularity_cap(*cap))
                .into_iter()
                .enumerate()
                .map(move |(i, filter)| SearchAttempt {
                    cap: *cap,
                    tier: i + 1,
                    filter,
                })
        })
        .collect()
}

/// Tier list for the uncapped chat search path
pub fn plan_uncapped(constraints: &PreferenceConstraints) -> Vec<SearchAttempt> {
    plan_attempts(&constraints.with_popularity_cap(None), &[None])
}
