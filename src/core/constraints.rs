use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use crate::models::PreferenceConstraints;

/// Reasons a set of filter parameters cannot be turned into constraints
#[derive(Debug, Error, PartialEq)]
pub enum ConstraintError {
    #[error("searchQuery is missing or empty")]
    MissingSearchQuery,
}

/// Filter parameters as produced by an LLM or a chat tool call
///
/// Every field is optional and untyped. Numbers may arrive as JSON numbers or
/// numeric strings; anything else is dropped during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilterParameters {
    #[serde(default)]
    pub search_query: Option<Value>,
    #[serde(default)]
    pub temperament_tags: Option<Value>,
    #[serde(default)]
    pub energy_min_value: Option<Value>,
    #[serde(default)]
    pub energy_max_value: Option<Value>,
    #[serde(default)]
    pub shedding_max_value: Option<Value>,
    #[serde(default)]
    pub grooming_max_value: Option<Value>,
    #[serde(default)]
    pub weight_min_kg: Option<Value>,
    #[serde(default)]
    pub weight_max_kg: Option<Value>,
    #[serde(default)]
    pub min_trainability_value: Option<Value>,
    #[serde(default)]
    pub popularity_max_rank: Option<Value>,
}

impl RawFilterParameters {
    /// Validate into constraints
    ///
    /// Unit-interval values outside [0, 1] and negative weights are dropped
    /// rather than clamped. `popularityMaxRank` is ignored: popularity caps
    /// are chosen by the search controller.
    pub fn into_constraints(self) -> Result<PreferenceConstraints, ConstraintError> {
        let search_query = self
            .search_query
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(ConstraintError::MissingSearchQuery)?
            .to_string();

        if self.popularity_max_rank.is_some() {
            tracing::debug!("Ignoring popularityMaxRank from filter parameters");
        }

        Ok(PreferenceConstraints {
            search_query,
            temperament_tags: normalize_tags(self.temperament_tags.as_ref()),
            energy_min_value: unit_interval("energyMinValue", self.energy_min_value.as_ref()),
            energy_max_value: unit_interval("energyMaxValue", self.energy_max_value.as_ref()),
            shedding_max_value: unit_interval("sheddingMaxValue", self.shedding_max_value.as_ref()),
            grooming_max_value: unit_interval("groomingMaxValue", self.grooming_max_value.as_ref()),
            weight_min_kg: non_negative("weightMinKg", self.weight_min_kg.as_ref()),
            weight_max_kg: non_negative("weightMaxKg", self.weight_max_kg.as_ref()),
            min_trainability_value: unit_interval(
                "minTrainabilityValue",
                self.min_trainability_value.as_ref(),
            ),
            popularity_max_rank: None,
        })
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn unit_interval(field: &str, value: Option<&Value>) -> Option<f64> {
    bounded(field, value, |v| (0.0..=1.0).contains(&v))
}

fn non_negative(field: &str, value: Option<&Value>) -> Option<f64> {
    bounded(field, value, |v| v >= 0.0)
}

fn bounded(field: &str, value: Option<&Value>, accept: impl Fn(f64) -> bool) -> Option<f64> {
    let value = value.filter(|v| !v.is_null())?;
    match as_number(value) {
        Some(v) if v.is_finite() && accept(v) => Some(v),
        _ => {
            tracing::warn!("Dropping invalid {} value: {}", field, value);
            None
        }
    }
}

/// Lowercase, strip quoting characters, drop empties, dedupe keeping first-seen order
fn normalize_tags(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<&str> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(joined)) => joined.split(',').collect(),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let cleaned: String = tag
            .chars()
            .filter(|c| *c != '"' && *c != '\\')
            .collect::<String>()
            .trim()
            .to_lowercase();
        if !cleaned.is_empty() && !tags.contains(&cleaned) {
            tags.push(cleaned);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawFilterParameters {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_parameters() {
        let constraints = raw(json!({
            "searchQuery": "  family dog  ",
            "temperamentTags": ["Friendly", "friendly", "Calm"],
            "energyMaxValue": 0.6,
            "weightMinKg": "11.5",
            "weightMaxKg": 22
        }))
        .into_constraints()
        .unwrap();

        assert_eq!(constraints.search_query, "family dog");
        assert_eq!(constraints.temperament_tags, vec!["friendly", "calm"]);
        assert_eq!(constraints.energy_max_value, Some(0.6));
        assert_eq!(constraints.weight_min_kg, Some(11.5));
        assert_eq!(constraints.weight_max_kg, Some(22.0));
        assert_eq!(constraints.energy_min_value, None);
    }

    #[test]
    fn test_missing_search_query() {
        let result = raw(json!({ "searchQuery": "   ", "energyMaxValue": 0.4 })).into_constraints();
        assert_eq!(result, Err(ConstraintError::MissingSearchQuery));

        let result = raw(json!({ "temperamentTags": ["calm"] })).into_constraints();
        assert_eq!(result, Err(ConstraintError::MissingSearchQuery));
    }

    #[test]
    fn test_out_of_range_values_dropped() {
        let constraints = raw(json!({
            "searchQuery": "dog",
            "energyMinValue": 1.4,
            "sheddingMaxValue": -0.2,
            "groomingMaxValue": "lots",
            "weightMinKg": -3,
            "minTrainabilityValue": { "value": 0.6 }
        }))
        .into_constraints()
        .unwrap();

        assert_eq!(constraints.energy_min_value, None);
        assert_eq!(constraints.shedding_max_value, None);
        assert_eq!(constraints.grooming_max_value, None);
        assert_eq!(constraints.weight_min_kg, None);
        assert_eq!(constraints.min_trainability_value, None);
    }

    #[test]
    fn test_popularity_rank_ignored() {
        let constraints = raw(json!({ "searchQuery": "dog", "popularityMaxRank": 10 }))
            .into_constraints()
            .unwrap();

        assert_eq!(constraints.popularity_max_rank, None);
    }

    #[test]
    fn test_tags_from_string_are_sanitized() {
        let constraints = raw(json!({
            "searchQuery": "dog",
            "temperamentTags": "Alert, \"watchful\", , loyal\\"
        }))
        .into_constraints()
        .unwrap();

        assert_eq!(constraints.temperament_tags, vec!["alert", "watchful", "loyal"]);
    }
}
