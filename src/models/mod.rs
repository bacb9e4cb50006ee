// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BreedGroup, BreedProfile, BreedRecord, Labelled, MatchedAttribute, PreferenceConstraints,
    QuestionAnswer, Recommendation, ScoredBreed, SearchHit,
};
pub use requests::{BreedSearchRequest, DogImageQuery, RecommendRequest};
pub use responses::{
    BreedListResponse, BreedResponse, BreedSearchResponse, DogImageResponse, ErrorResponse,
    HealthResponse, RecommendResponse,
};
