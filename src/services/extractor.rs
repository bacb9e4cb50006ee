use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use crate::core::constraints::RawFilterParameters;
use crate::models::{PreferenceConstraints, QuestionAnswer};

/// Errors that can occur while turning answers into constraints
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No questionnaire answers provided")]
    NoAnswers,

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Extraction API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Malformed extraction output: {0}")]
    Malformed(String),
}

impl ExtractionError {
    /// True when the caller's input was at fault rather than the upstream service
    pub fn is_validation(&self) -> bool {
        matches!(self, ExtractionError::NoAnswers)
    }
}

/// Turns questionnaire answers into search constraints
#[async_trait]
pub trait ConstraintExtractor: Send + Sync {
    async fn extract(&self, answers: &[QuestionAnswer]) -> Result<PreferenceConstraints, ExtractionError>;
}

/// Constraint change implied by one answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleEffect {
    None,
    Weight { min: Option<f64>, max: Option<f64> },
    EnergyAtMost(f64),
    EnergyAtLeast(f64),
    TrainabilityAtLeast(f64),
    LowShedding { shedding: f64, grooming: f64 },
}

impl RuleEffect {
    fn apply(&self, constraints: &mut PreferenceConstraints) {
        match *self {
            RuleEffect::None => {}
            RuleEffect::Weight { min, max } => {
                constraints.weight_min_kg = min;
                constraints.weight_max_kg = max;
            }
            RuleEffect::EnergyAtMost(max) => constraints.energy_max_value = Some(max),
            RuleEffect::EnergyAtLeast(min) => constraints.energy_min_value = Some(min),
            RuleEffect::TrainabilityAtLeast(min) => constraints.min_trainability_value = Some(min),
            RuleEffect::LowShedding { shedding, grooming } => {
                constraints.shedding_max_value = Some(shedding);
                constraints.grooming_max_value = Some(grooming);
            }
        }
    }
}

impl fmt::Display for RuleEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleEffect::None => f.write_str("no filter"),
            RuleEffect::Weight { min: Some(min), max: Some(max) } => {
                write!(f, "weightMinKg: {}, weightMaxKg: {}", min, max)
            }
            RuleEffect::Weight { min: Some(min), max: None } => write!(f, "weightMinKg: {}", min),
            RuleEffect::Weight { min: None, max: Some(max) } => write!(f, "weightMaxKg: {}", max),
            RuleEffect::Weight { min: None, max: None } => f.write_str("no weight filter"),
            RuleEffect::EnergyAtMost(max) => write!(f, "energyMaxValue: {}", max),
            RuleEffect::EnergyAtLeast(min) => write!(f, "energyMinValue: {}", min),
            RuleEffect::TrainabilityAtLeast(min) => write!(f, "minTrainabilityValue: {}", min),
            RuleEffect::LowShedding { shedding, grooming } => {
                write!(f, "sheddingMaxValue: {}, groomingMaxValue: {}", shedding, grooming)
            }
        }
    }
}

/// How one questionnaire answer maps to search terms and filters
#[derive(Debug, Clone, Copy)]
pub struct ConversionRule {
    pub question_id: &'static str,
    pub topic: &'static str,
    pub answer_id: &'static str,
    pub answer: &'static str,
    pub search_terms: Option<&'static str>,
    pub effect: RuleEffect,
}

const fn rule(
    question_id: &'static str,
    topic: &'static str,
    answer_id: &'static str,
    answer: &'static str,
    search_terms: Option<&'static str>,
    effect: RuleEffect,
) -> ConversionRule {
    ConversionRule { question_id, topic, answer_id, answer, search_terms, effect }
}

/// Questionnaire conversion rules shared by every extractor
pub const CONVERSION_RULES: &[ConversionRule] = &[
    rule("1", "Living situation", "0", "Apartment", Some("apartment friendly indoor dog small space, condo apartment"), RuleEffect::None),
    rule("1", "Living situation", "1", "House with yard", Some("active outdoor dog house yard"), RuleEffect::None),
    rule("1", "Living situation", "2", "Rural property", Some("working farm dog rural property"), RuleEffect::None),
    rule("1", "Living situation", "3", "Busy downtown area", Some("city, business district, urban, downtown, high traffic area"), RuleEffect::None),
    rule("2", "Size", "0", "Extra small (0-10lbs)", Some("tiny toy breed under 4 kg"), RuleEffect::Weight { min: None, max: Some(4.5) }),
    rule("2", "Size", "1", "Small (11-25lbs)", Some("small dog 4-11 kg"), RuleEffect::Weight { min: Some(4.5), max: Some(11.5) }),
    rule("2", "Size", "2", "Medium (26-50lbs)", Some("medium sized dog 12-22 kg"), RuleEffect::Weight { min: Some(11.5), max: Some(22.0) }),
    rule("2", "Size", "3", "Large (51-100lbs)", Some("large dog 23-44 kg"), RuleEffect::Weight { min: Some(22.0), max: Some(44.0) }),
    rule("2", "Size", "4", "Extra large (101+ lbs)", Some("extra large giant breed over 45 kg"), RuleEffect::Weight { min: Some(44.0), max: None }),
    rule("3", "Training experience", "0", "Has experience", None, RuleEffect::None),
    rule("3", "Training experience", "1", "No experience", None, RuleEffect::TrainabilityAtLeast(0.6)),
    rule("4", "Daily exercise", "0", "Less than 30 minutes", Some("low energy, calm, couch potato, lazy, mellow, independent"), RuleEffect::EnergyAtMost(0.4)),
    rule("4", "Daily exercise", "1", "30-60 minutes", Some("regular exercise regular activity"), RuleEffect::EnergyAtMost(0.6)),
    rule("4", "Daily exercise", "2", "1-2 hours", None, RuleEffect::EnergyAtLeast(0.6)),
    rule("4", "Daily exercise", "3", "2+ hours", None, RuleEffect::EnergyAtLeast(0.8)),
    rule("5", "Children", "yes", "Yes", Some("family friendly good with children gentle temperament"), RuleEffect::None),
    rule("6", "Other pets", "yes", "Yes", Some("good with other dogs cats pets sociable"), RuleEffect::None),
    rule("7", "Allergies", "yes", "Yes", Some("low shedding hypoallergenic minimal shedding, Occasional Bath/Brush"), RuleEffect::LowShedding { shedding: 0.4, grooming: 0.4 }),
];

/// Question id whose free-text answer drives temperament tags
pub const PERSONALITY_QUESTION_ID: &str = "8";

/// Personality keywords and the temperament tags they imply
pub const PERSONALITY_TAGS: &[(&str, &[&str])] = &[
    ("independent", &["independent", "reserved", "alert"]),
    ("lap dog", &["friendly", "affectionate", "devoted"]),
    ("lazy", &["calm", "gentle", "mellow"]),
    ("protective", &["alert", "territorial", "watchful"]),
];

/// Render the rules as prompt text for an LLM extractor
pub fn render_rules() -> String {
    let mut lines = Vec::new();
    let mut topic = "";

    for rule in CONVERSION_RULES.iter().filter(|r| r.effect != RuleEffect::None) {
        if rule.topic != topic {
            topic = rule.topic;
            lines.push(format!("\n{}:", topic.to_uppercase()));
        }
        lines.push(format!("- {} → {}", rule.answer, rule.effect));
    }

    lines.push("\nTEMPERAMENT TAGS:".to_string());
    for (keyword, tags) in PERSONALITY_TAGS {
        let quoted: Vec<String> = tags.iter().map(|t| format!("'{}'", t)).collect();
        lines.push(format!("- {} → {}", keyword, quoted.join(", ")));
    }

    lines.join("\n")
}

/// Deterministic extractor applying `CONVERSION_RULES` directly
#[derive(Debug, Clone, Default)]
pub struct RuleBasedExtractor;

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Apply the rules to a set of answers
    pub fn convert(&self, answers: &[QuestionAnswer]) -> Result<PreferenceConstraints, ExtractionError> {
        if answers.is_empty() {
            return Err(ExtractionError::NoAnswers);
        }

        let mut constraints = PreferenceConstraints::default();
        let mut search_terms: Vec<&str> = Vec::new();

        for qa in answers {
            if qa.question.id == PERSONALITY_QUESTION_ID {
                let personality = qa.answer.text.to_lowercase();
                for (keyword, tags) in PERSONALITY_TAGS {
                    if personality.contains(keyword) {
                        for tag in *tags {
                            if !constraints.temperament_tags.iter().any(|t| t == tag) {
                                constraints.temperament_tags.push(tag.to_string());
                            }
                        }
                    }
                }
                continue;
            }

            let matched = CONVERSION_RULES
                .iter()
                .find(|r| r.question_id == qa.question.id && r.answer_id == qa.answer.id);

            match matched {
                Some(rule) => {
                    search_terms.extend(rule.search_terms);
                    rule.effect.apply(&mut constraints);
                }
                None => tracing::debug!(
                    "No conversion rule for question {} answer {}",
                    qa.question.id,
                    qa.answer.id
                ),
            }
        }

        let answers_text = answers
            .iter()
            .map(|qa| format!("{}: {}", qa.question.text, qa.answer.text))
            .collect::<Vec<_>>()
            .join("\n");
        constraints.search_query = format!(
            "{}.\n\nOriginal answers:\n{}",
            search_terms.join(". "),
            answers_text
        );

        Ok(constraints)
    }
}

#[async_trait]
impl ConstraintExtractor for RuleBasedExtractor {
    async fn extract(&self, answers: &[QuestionAnswer]) -> Result<PreferenceConstraints, ExtractionError> {
        self.convert(answers)
    }
}

const SYSTEM_PROMPT: &str = "You are a dog breed search expert. Analyze the user's questionnaire answers \
and return a JSON object with these optional fields: searchQuery (string, required), temperamentTags \
(array of lowercase strings), energyMinValue, energyMaxValue, sheddingMaxValue, groomingMaxValue, \
minTrainabilityValue (numbers on a 0-1 scale), weightMinKg, weightMaxKg (numbers in kg). \
Only include a filter when the user explicitly indicates a preference and be conservative so that \
results remain possible. Build searchQuery from living situation, size, energy, family needs and \
personality keywords.\n\nCONVERSION RULES:";

/// Extractor backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiExtractor {
    api_base: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiExtractor {
    pub fn new(
        api_base: String,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
            client,
        })
    }

    fn request_body(&self, answers: &[QuestionAnswer]) -> Result<Value, ExtractionError> {
        let answers_json = serde_json::to_string_pretty(answers)
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        Ok(json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": format!("{}\n{}", SYSTEM_PROMPT, render_rules()) },
                {
                    "role": "user",
                    "content": format!(
                        "Analyze these questionnaire answers and generate filter parameters:\n\n{}",
                        answers_json
                    )
                }
            ]
        }))
    }
}

/// Pull the filter parameters out of a chat completion response
pub fn parse_completion(json: &Value) -> Result<RawFilterParameters, ExtractionError> {
    let content = json
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| ExtractionError::Malformed("Missing message content".into()))?;

    serde_json::from_str(content)
        .map_err(|e| ExtractionError::Malformed(format!("Content is not a filter object: {}", e)))
}

#[async_trait]
impl ConstraintExtractor for OpenAiExtractor {
    async fn extract(&self, answers: &[QuestionAnswer]) -> Result<PreferenceConstraints, ExtractionError> {
        if answers.is_empty() {
            return Err(ExtractionError::NoAnswers);
        }

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.request_body(answers)?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(ExtractionError::ApiError { status, body });
        }

        let json: Value = response.json().await?;
        let raw = parse_completion(&json)?;

        let constraints = raw
            .into_constraints()
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        tracing::debug!("Extracted constraints: {:?}", constraints);

        Ok(constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Labelled;

    fn qa(question_id: &str, question: &str, answer_id: &str, answer: &str) -> QuestionAnswer {
        QuestionAnswer {
            question: Labelled { id: question_id.to_string(), text: question.to_string() },
            answer: Labelled { id: answer_id.to_string(), text: answer.to_string() },
        }
    }

    fn create_test_answers() -> Vec<QuestionAnswer> {
        vec![
            qa("1", "Where do you live?", "0", "Apartment"),
            qa("2", "What size dog?", "3", "Large (51-100lbs)"),
            qa("3", "Training experience?", "1", "No experience"),
            qa("4", "Daily exercise?", "0", "Less than 30 minutes"),
            qa("7", "Allergies?", "yes", "Yes"),
            qa("8", "Personality?", "1", "A lap dog, but protective"),
        ]
    }

    #[test]
    fn test_rule_based_conversion() {
        let constraints = RuleBasedExtractor::new().convert(&create_test_answers()).unwrap();

        assert_eq!(constraints.weight_min_kg, Some(22.0));
        assert_eq!(constraints.weight_max_kg, Some(44.0));
        assert_eq!(constraints.min_trainability_value, Some(0.6));
        assert_eq!(constraints.energy_max_value, Some(0.4));
        assert_eq!(constraints.energy_min_value, None);
        assert_eq!(constraints.shedding_max_value, Some(0.4));
        assert_eq!(constraints.grooming_max_value, Some(0.4));
        assert_eq!(
            constraints.temperament_tags,
            vec!["friendly", "affectionate", "devoted", "alert", "territorial", "watchful"]
        );
        assert!(constraints
            .search_query
            .starts_with("apartment friendly indoor dog small space, condo apartment. large dog 23-44 kg"));
        assert!(constraints.search_query.contains("\n\nOriginal answers:\nWhere do you live?: Apartment"));
    }

    #[test]
    fn test_rule_based_requires_answers() {
        let result = RuleBasedExtractor::new().convert(&[]);
        assert!(matches!(result, Err(ExtractionError::NoAnswers)));
    }

    #[test]
    fn test_unknown_answer_ignored() {
        let constraints = RuleBasedExtractor::new()
            .convert(&[qa("2", "What size dog?", "9", "Horse sized")])
            .unwrap();

        assert_eq!(constraints.weight_min_kg, None);
        assert_eq!(constraints.search_query, ".\n\nOriginal answers:\nWhat size dog?: Horse sized");
    }

    #[test]
    fn test_render_rules() {
        let rules = render_rules();

        assert!(rules.contains("SIZE:"));
        assert!(rules.contains("- Large (51-100lbs) → weightMinKg: 22, weightMaxKg: 44"));
        assert!(rules.contains("- Extra large (101+ lbs) → weightMinKg: 44"));
        assert!(rules.contains("- No experience → minTrainabilityValue: 0.6"));
        assert!(rules.contains("- lazy → 'calm', 'gentle', 'mellow'"));
        assert!(!rules.contains("Apartment"));
    }

    #[test]
    fn test_parse_completion() {
        let json = json!({
            "choices": [
                { "message": { "content": "{\"searchQuery\": \"calm dog\", \"energyMaxValue\": 0.4}" } }
            ]
        });

        let constraints = parse_completion(&json).unwrap().into_constraints().unwrap();

        assert_eq!(constraints.search_query, "calm dog");
        assert_eq!(constraints.energy_max_value, Some(0.4));
    }

    #[test]
    fn test_parse_completion_malformed() {
        let not_json = json!({ "choices": [{ "message": { "content": "I think a beagle" } }] });
        assert!(matches!(parse_completion(&not_json), Err(ExtractionError::Malformed(_))));

        let empty = json!({ "choices": [] });
        assert!(matches!(parse_completion(&empty), Err(ExtractionError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_openai_extractor_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let content = json!({ "searchQuery": "big gentle dog", "weightMinKg": 44, "energyMinValue": 3 });
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": { "content": content.to_string() } }] }).to_string(),
            )
            .create_async()
            .await;

        let extractor =
            OpenAiExtractor::new(server.url(), "sk-test".into(), "gpt-4o".into(), 5).unwrap();
        let constraints = extractor.extract(&create_test_answers()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(constraints.search_query, "big gentle dog");
        assert_eq!(constraints.weight_min_kg, Some(44.0));
        assert_eq!(constraints.energy_min_value, None);
    }

    #[tokio::test]
    async fn test_openai_extractor_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let extractor =
            OpenAiExtractor::new(server.url(), "sk-test".into(), "gpt-4o".into(), 5).unwrap();
        let result = extractor.extract(&create_test_answers()).await;

        match result {
            Err(e @ ExtractionError::ApiError { status: 500, .. }) => assert!(!e.is_validation()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_openai_extractor_missing_query_is_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({ "choices": [{ "message": { "content": "{}" } }] }).to_string())
            .create_async()
            .await;

        let extractor =
            OpenAiExtractor::new(server.url(), "sk-test".into(), "gpt-4o".into(), 5).unwrap();

        assert!(matches!(
            extractor.extract(&create_test_answers()).await,
            Err(ExtractionError::Malformed(_))
        ));
    }
}
