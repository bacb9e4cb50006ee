use serde::{Deserialize, Deserializer, Serialize};

/// Validated search constraints for one recommendation request
///
/// Built once per request (see `core::constraints`) and read-only afterwards.
/// `popularity_max_rank` is never part of the user's constraints; the search
/// controller sets it on a copy for each capped attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceConstraints {
    pub search_query: String,
    #[serde(default)]
    pub temperament_tags: Vec<String>,
    #[serde(default)]
    pub energy_min_value: Option<f64>,
    #[serde(default)]
    pub energy_max_value: Option<f64>,
    #[serde(default)]
    pub shedding_max_value: Option<f64>,
    #[serde(default)]
    pub grooming_max_value: Option<f64>,
    #[serde(default)]
    pub weight_min_kg: Option<f64>,
    #[serde(default)]
    pub weight_max_kg: Option<f64>,
    #[serde(default)]
    pub min_trainability_value: Option<f64>,
    #[serde(default)]
    pub popularity_max_rank: Option<u32>,
}

impl PreferenceConstraints {
    pub fn new(search_query: impl Into<String>) -> Self {
        Self {
            search_query: search_query.into(),
            ..Default::default()
        }
    }

    /// Copy of these constraints with the given popularity cap applied
    pub fn with_popularity_cap(&self, cap: Option<u32>) -> Self {
        Self {
            popularity_max_rank: cap,
            ..self.clone()
        }
    }
}

/// AKC breed groups as stored in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreedGroup {
    #[serde(rename = "Foundation Stock Service")]
    FoundationStockService,
    #[serde(rename = "Herding Group")]
    Herding,
    #[serde(rename = "Hound Group")]
    Hound,
    #[serde(rename = "Miscellaneous Class")]
    MiscellaneousClass,
    #[serde(rename = "Non-Sporting Group")]
    NonSporting,
    #[serde(rename = "Sporting Group")]
    Sporting,
    #[serde(rename = "Terrier Group")]
    Terrier,
    #[serde(rename = "Toy Group")]
    Toy,
    #[serde(rename = "Working Group")]
    Working,
    #[serde(other)]
    Other,
}

impl Default for BreedGroup {
    fn default() -> Self {
        BreedGroup::Other
    }
}

/// Breed metadata as stored alongside each vector in the index
///
/// Field names follow the index metadata keys. Owned by the search backend;
/// the service only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedRecord {
    pub breed: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_temperament")]
    pub temperament: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_rank")]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub min_height: f64,
    #[serde(default)]
    pub max_height: f64,
    #[serde(default)]
    pub min_weight: f64,
    #[serde(default)]
    pub max_weight: f64,
    #[serde(default)]
    pub min_expectancy: f64,
    #[serde(default)]
    pub max_expectancy: f64,
    #[serde(default)]
    pub group: BreedGroup,
    #[serde(default)]
    pub grooming_frequency_value: Option<f64>,
    #[serde(default)]
    pub grooming_frequency_category: Option<String>,
    #[serde(default)]
    pub shedding_value: Option<f64>,
    #[serde(default)]
    pub shedding_category: Option<String>,
    #[serde(default)]
    pub energy_level_value: Option<f64>,
    #[serde(default)]
    pub energy_level_category: Option<String>,
    #[serde(default)]
    pub trainability_value: Option<f64>,
    #[serde(default)]
    pub trainability_category: Option<String>,
    #[serde(default)]
    pub demeanor_value: Option<f64>,
    #[serde(default)]
    pub demeanor_category: Option<String>,
}

/// Temperament arrives either as a list or as a comma separated string
fn deserialize_temperament<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
        Missing(Option<()>),
    }

    let traits = match Raw::deserialize(deserializer)? {
        Raw::List(items) => items,
        Raw::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        Raw::Missing(_) => Vec::new(),
    };

    Ok(traits
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect())
}

/// Popularity ranks are written as floats by some ingestion runs
fn deserialize_rank<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|r| r.is_finite()).map(|r| r.round() as i64))
}

/// One similarity search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    #[serde(rename = "metadata")]
    pub record: BreedRecord,
}

/// Question and answer pair from the questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: Labelled,
    pub answer: Labelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labelled {
    pub id: String,
    pub text: String,
}

/// Per-category explanation of how the recommended breed meets a constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedAttribute {
    pub category: String,
    pub label: String,
    pub breed_value: String,
    pub user_value: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeView {
    pub height: Range,
    pub weight: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroomingView {
    pub frequency: Option<String>,
    pub value: Option<f64>,
    pub shedding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelView {
    pub level: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemeanorView {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<f64>,
}

/// Display shape of a breed, shared by recommendations and lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedProfile {
    pub breed: String,
    pub description: String,
    pub temperament: Vec<String>,
    pub popularity: Option<i64>,
    pub size: SizeView,
    pub life_expectancy: Range,
    pub group: BreedGroup,
    pub grooming: GroomingView,
    pub energy: LevelView,
    pub trainability: LevelView,
    pub demeanor: DemeanorView,
}

impl From<&BreedRecord> for BreedProfile {
    fn from(record: &BreedRecord) -> Self {
        Self {
            breed: record.breed.clone(),
            description: record.description.clone(),
            temperament: record.temperament.clone(),
            popularity: record.popularity,
            size: SizeView {
                height: Range { min: record.min_height, max: record.max_height },
                weight: Range { min: record.min_weight, max: record.max_weight },
            },
            life_expectancy: Range {
                min: record.min_expectancy,
                max: record.max_expectancy,
            },
            group: record.group,
            grooming: GroomingView {
                frequency: record.grooming_frequency_category.clone(),
                value: record.grooming_frequency_value,
                shedding: record.shedding_category.clone(),
            },
            energy: LevelView {
                level: record.energy_level_category.clone(),
                value: record.energy_level_value,
            },
            trainability: LevelView {
                level: record.trainability_category.clone(),
                value: record.trainability_value,
            },
            demeanor: DemeanorView {
                kind: record.demeanor_category.clone(),
                value: record.demeanor_value,
            },
        }
    }
}

/// Final answer for one questionnaire submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub match_score: u8,
    pub why: String,
    #[serde(flatten)]
    pub profile: BreedProfile,
    pub matched_attributes: Vec<MatchedAttribute>,
}

/// Chat tool view of a hit: the breed plus its raw similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredBreed {
    #[serde(flatten)]
    pub profile: BreedProfile,
    pub score: f64,
}
