use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::core::constraints::RawFilterParameters;
use crate::models::domain::QuestionAnswer;

/// Request to recommend a breed from questionnaire answers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "questionnaire_answers", rename = "questionnaireAnswers", default)]
    pub questionnaire_answers: Vec<QuestionAnswer>,
}

/// Chat tool search request
///
/// Parameters come straight from an LLM tool call, so they go through the
/// same validation as extractor output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedSearchRequest {
    #[serde(flatten)]
    pub params: RawFilterParameters,
    #[serde(alias = "top_k", rename = "topK", default)]
    pub top_k: Option<usize>,
}

/// Query string for the dog image endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DogImageQuery {
    #[serde(alias = "breed_name", rename = "breedName", default)]
    pub breed_name: Option<String>,
}
