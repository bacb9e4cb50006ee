use std::fmt;
use crate::models::{BreedRecord, PreferenceConstraints};

/// One conjunct of a metadata filter
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Breed temperament contains any of the tags
    Temperament(Vec<String>),
    Energy { min: Option<f64>, max: Option<f64> },
    Shedding { max: f64 },
    Grooming { max: f64 },
    /// Breed weight range lies inside the requested bounds
    Weight { min: Option<f64>, max: Option<f64> },
    Trainability { min: f64 },
    /// Ranked breeds only, at or above the cap. Unranked breeds never pass.
    Popularity { cap: u32 },
}

impl Clause {
    /// Evaluate the clause against a record; missing metadata fails
    pub fn matches(&self, record: &BreedRecord) -> bool {
        match self {
            Clause::Temperament(tags) => tags.iter().any(|t| record.temperament.contains(t)),
            Clause::Energy { min, max } => within(record.energy_level_value, *min, *max),
            Clause::Shedding { max } => within(record.shedding_value, None, Some(*max)),
            Clause::Grooming { max } => within(record.grooming_frequency_value, None, Some(*max)),
            Clause::Weight { min, max } => {
                min.map_or(true, |m| record.min_weight >= m)
                    && max.map_or(true, |m| record.max_weight <= m)
            }
            Clause::Trainability { min } => within(record.trainability_value, Some(*min), None),
            Clause::Popularity { cap } => record
                .popularity
                .map_or(false, |p| p >= 1 && p <= i64::from(*cap)),
        }
    }
}

#[inline]
fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    match value {
        Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
        None => false,
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Temperament(tags) => {
                let any = tags
                    .iter()
                    .map(|t| format!("temperament CONTAINS \"{}\"", t))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                write!(f, "({})", any)
            }
            Clause::Energy { min, max } => {
                write!(f, "({})", bounds("energyLevelValue", *min, "energyLevelValue", *max))
            }
            Clause::Shedding { max } => write!(f, "(sheddingValue <= {})", max),
            Clause::Grooming { max } => write!(f, "(groomingFrequencyValue <= {})", max),
            Clause::Weight { min, max } => {
                write!(f, "({})", bounds("minWeight", *min, "maxWeight", *max))
            }
            Clause::Trainability { min } => write!(f, "(trainabilityValue >= {})", min),
            Clause::Popularity { cap } => {
                write!(f, "(popularity >= 1 AND popularity <= {})", cap)
            }
        }
    }
}

fn bounds(min_field: &str, min: Option<f64>, max_field: &str, max: Option<f64>) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(min) = min {
        parts.push(format!("{} >= {}", min_field, min));
    }
    if let Some(max) = max {
        parts.push(format!("{} <= {}", max_field, max));
    }
    parts.join(" AND ")
}

/// Conjunction of clauses, rendered in the vector index filter syntax
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    clauses: Vec<Clause>,
}

impl FilterExpression {
    /// Evaluate the whole expression locally
    pub fn matches(&self, record: &BreedRecord) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

/// Build the metadata filter for a set of constraints
///
/// Clauses are emitted in a fixed order so the same constraints always give
/// the same expression text. Returns `None` when nothing is constrained,
/// meaning a plain semantic search.
pub fn build_filter(constraints: &PreferenceConstraints) -> Option<FilterExpression> {
    let mut clauses = Vec::new();

    if !constraints.temperament_tags.is_empty() {
        clauses.push(Clause::Temperament(constraints.temperament_tags.clone()));
    }

    if constraints.energy_min_value.is_some() || constraints.energy_max_value.is_some() {
        clauses.push(Clause::Energy {
            min: constraints.energy_min_value,
            max: constraints.energy_max_value,
        });
    }

    if let Some(max) = constraints.shedding_max_value {
        clauses.push(Clause::Shedding { max });
    }

    if let Some(max) = constraints.grooming_max_value {
        clauses.push(Clause::Grooming { max });
    }

    if constraints.weight_min_kg.is_some() || constraints.weight_max_kg.is_some() {
        clauses.push(Clause::Weight {
            min: constraints.weight_min_kg,
            max: constraints.weight_max_kg,
        });
    }

    if let Some(min) = constraints.min_trainability_value {
        clauses.push(Clause::Trainability { min });
    }

    if let Some(cap) = constraints.popularity_max_rank {
        clauses.push(Clause::Popularity { cap });
    }

    if clauses.is_empty() {
        None
    } else {
        Some(FilterExpression { clauses })
    }
}
