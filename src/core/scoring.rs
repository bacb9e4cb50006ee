use crate::models::{BreedProfile, BreedRecord, MatchedAttribute, PreferenceConstraints, Recommendation, SearchHit};

/// Pounds per kilogram
const LBS_PER_KG: f64 = 2.20462;

/// Convert kilograms to whole pounds for display
#[inline]
pub fn kg_to_lbs(kg: f64) -> i64 {
    (kg * LBS_PER_KG).round() as i64
}

/// Map a similarity score to the 0-100 match score shown to users
///
/// Linear in the clamped score and independent of how many attributes
/// matched. Infinite scores saturate at the bounds; NaN maps to 0.
#[inline]
pub fn match_score(similarity: f64) -> u8 {
    if similarity.is_nan() {
        return 0;
    }
    (similarity.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Explain how a breed meets each constraint the user actually gave
///
/// Emits at most one entry per category, in the order temperament, energy,
/// trainability, weight, shedding, grooming. Unspecified categories produce
/// no entry.
pub fn explain(constraints: &PreferenceConstraints, record: &BreedRecord) -> Vec<MatchedAttribute> {
    let mut attributes = Vec::new();

    if !constraints.temperament_tags.is_empty() {
        let user_tags: Vec<String> = constraints
            .temperament_tags
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        let breed_traits: Vec<String> = record
            .temperament
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();

        attributes.push(MatchedAttribute {
            category: "Temperament".to_string(),
            label: "Temperament match".to_string(),
            breed_value: record.temperament.join(", "),
            user_value: user_tags.join(", "),
            matched: user_tags.iter().any(|t| breed_traits.contains(t)),
        });
    }

    let (energy_min, energy_max) = (constraints.energy_min_value, constraints.energy_max_value);
    if energy_min.is_some() || energy_max.is_some() {
        attributes.push(MatchedAttribute {
            category: "Energy".to_string(),
            label: "Energy preference".to_string(),
            breed_value: label_or_na(record.energy_level_category.as_deref()),
            user_value: describe_bounds(energy_min, energy_max, ""),
            matched: in_bounds(record.energy_level_value, energy_min, energy_max),
        });
    }

    if let Some(min) = constraints.min_trainability_value {
        attributes.push(MatchedAttribute {
            category: "Trainability".to_string(),
            label: "Trainability".to_string(),
            breed_value: label_or_na(record.trainability_category.as_deref()),
            user_value: describe_bounds(Some(min), None, ""),
            matched: in_bounds(record.trainability_value, Some(min), None),
        });
    }

    let (weight_min, weight_max) = (constraints.weight_min_kg, constraints.weight_max_kg);
    if weight_min.is_some() || weight_max.is_some() {
        // Compare in kilograms, display in pounds
        let meets_min = weight_min.map_or(true, |m| record.min_weight >= m);
        let meets_max = weight_max.map_or(true, |m| record.max_weight <= m);

        attributes.push(MatchedAttribute {
            category: "Size".to_string(),
            label: "Weight preference".to_string(),
            breed_value: format!(
                "{}-{} lbs",
                kg_to_lbs(record.min_weight),
                kg_to_lbs(record.max_weight)
            ),
            user_value: describe_bounds(
                weight_min.map(|w| kg_to_lbs(w) as f64),
                weight_max.map(|w| kg_to_lbs(w) as f64),
                " lbs",
            ),
            matched: meets_min && meets_max,
        });
    }

    if let Some(max) = constraints.shedding_max_value {
        attributes.push(MatchedAttribute {
            category: "Allergies".to_string(),
            label: "Shedding".to_string(),
            breed_value: label_or_na(record.shedding_category.as_deref()),
            user_value: describe_bounds(None, Some(max), ""),
            matched: in_bounds(record.shedding_value, None, Some(max)),
        });
    }

    if let Some(max) = constraints.grooming_max_value {
        attributes.push(MatchedAttribute {
            category: "Grooming".to_string(),
            label: "Grooming".to_string(),
            breed_value: label_or_na(record.grooming_frequency_category.as_deref()),
            user_value: describe_bounds(None, Some(max), ""),
            matched: in_bounds(record.grooming_frequency_value, None, Some(max)),
        });
    }

    attributes
}

#[inline]
fn in_bounds(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    match value {
        Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
        None => false,
    }
}

fn label_or_na(label: Option<&str>) -> String {
    match label {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => "N/A".to_string(),
    }
}

/// Render bounds as "≥ a and ≤ b"
fn describe_bounds(min: Option<f64>, max: Option<f64>, unit: &str) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("≥ {}{} and ≤ {}{}", min, unit, max, unit),
        (Some(min), None) => format!("≥ {}{}", min, unit),
        (None, Some(max)) => format!("≤ {}{}", max, unit),
        (None, None) => "Any".to_string(),
    }
}

/// One-line summary of why the breed was picked
pub fn summarize(record: &BreedRecord) -> String {
    let temperament = if record.temperament.is_empty() {
        "good temperament".to_string()
    } else {
        record.temperament.join(", ")
    };
    let energy = record
        .energy_level_category
        .as_deref()
        .filter(|e| !e.is_empty())
        .unwrap_or("moderate energy");

    format!(
        "{} matches your preferences: {}, {}, {}-{}cm.",
        record.breed, temperament, energy, record.min_height, record.max_height
    )
}

/// Assemble the user-facing recommendation for a winning hit
pub fn build_recommendation(constraints: &PreferenceConstraints, hit: &SearchHit) -> Recommendation {
    Recommendation {
        match_score: match_score(hit.score),
        why: summarize(&hit.record),
        profile: BreedProfile::from(&hit.record),
        matched_attributes: explain(constraints, &hit.record),
    }
}
