use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use crate::core::{
    scoring::build_recommendation,
    selection::select_best,
    tiers::{plan_attempts, plan_uncapped, SearchAttempt, DEFAULT_POPULARITY_CAPS, TIER_COUNT},
};
use crate::models::{BreedRecord, PreferenceConstraints, Recommendation, SearchHit};
use crate::services::search::{QueryRequest, SearchBackend, SearchError};

/// Query text used to enumerate the catalog
const CATALOG_QUERY: &str = "dog breed";

/// Errors returned by the matcher
///
/// `NotFound` means every search came back empty; `Backend` means a search
/// failed and the remaining attempts were abandoned.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("No matching dog breeds found")]
    NotFound,

    #[error("Search backend failed: {0}")]
    Backend(#[from] SearchError),
}

/// Winning hit and the attempt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch {
    pub hit: SearchHit,
    /// Popularity cap in force, `None` for uncapped
    pub used_cap: Option<u32>,
    /// 1-based tier position
    pub used_tier: usize,
}

/// Matcher tuning
#[derive(Debug, Clone)]
pub struct MatcherSettings {
    pub popularity_caps: Vec<Option<u32>>,
    pub top_k: usize,
    pub quick_top_k: usize,
    pub catalog_top_k: usize,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            popularity_caps: DEFAULT_POPULARITY_CAPS.to_vec(),
            top_k: 8,
            quick_top_k: 1,
            catalog_top_k: 300,
        }
    }
}

/// Tiered search controller
///
/// # Search order
/// 1. Popularity caps widen in the outer loop (most popular breeds first)
/// 2. Filter tiers relax in the inner loop
/// 3. The first attempt with any hits ends the search
///
/// Searches run one at a time. Empty results move on to the next attempt;
/// backend errors end the whole search.
#[derive(Clone)]
pub struct BreedMatcher {
    backend: Arc<dyn SearchBackend>,
    settings: MatcherSettings,
}

impl BreedMatcher {
    pub fn new(backend: Arc<dyn SearchBackend>, settings: MatcherSettings) -> Self {
        Self { backend, settings }
    }

    pub fn with_default_settings(backend: Arc<dyn SearchBackend>) -> Self {
        Self::new(backend, MatcherSettings::default())
    }

    /// Ordered (cap, tier) attempts for a constraint set
    pub fn plan(&self, constraints: &PreferenceConstraints) -> Vec<SearchAttempt> {
        plan_attempts(constraints, &self.settings.popularity_caps)
    }

    /// Run attempts in order and return the first one with hits
    async fn first_nonempty(
        &self,
        text: &str,
        top_k: usize,
        plan: Vec<SearchAttempt>,
    ) -> Result<Option<(SearchAttempt, Vec<SearchHit>)>, SearchError> {
        for attempt in plan {
            tracing::debug!(
                "Trying popularity cap {} tier {}/{}: {}",
                attempt.cap.map_or("any".to_string(), |c| c.to_string()),
                attempt.tier,
                TIER_COUNT,
                attempt.filter.as_ref().map_or("no filter".to_string(), |f| f.to_string())
            );

            let request = QueryRequest {
                text: text.to_string(),
                top_k,
                filter: attempt.filter.clone(),
            };
            let hits = self.backend.query(&request).await?;

            if !hits.is_empty() {
                tracing::debug!("Found {} hits with tier {}", hits.len(), attempt.tier);
                return Ok(Some((attempt, hits)));
            }
        }

        Ok(None)
    }

    /// Find the single best breed for a constraint set
    pub async fn find_best_match(
        &self,
        constraints: &PreferenceConstraints,
    ) -> Result<BestMatch, MatchError> {
        let plan = self.plan(constraints);

        let Some((attempt, hits)) = self
            .first_nonempty(&constraints.search_query, self.settings.top_k, plan)
            .await?
        else {
            tracing::info!("No results from any popularity cap or tier");
            return Err(MatchError::NotFound);
        };

        let hit = select_best(&hits).cloned().ok_or(MatchError::NotFound)?;

        Ok(BestMatch {
            hit,
            used_cap: attempt.cap,
            used_tier: attempt.tier,
        })
    }

    /// Fast single-result search used by the chat tool
    ///
    /// Same tier list as `find_best_match` but without popularity caps, and
    /// the first hit is taken as-is. A caller-supplied `top_k` is bounded
    /// by the catalog size.
    pub async fn quick_search(
        &self,
        constraints: &PreferenceConstraints,
        top_k: Option<usize>,
    ) -> Result<BestMatch, MatchError> {
        let top_k = top_k
            .unwrap_or(self.settings.quick_top_k)
            .clamp(1, self.settings.catalog_top_k.max(1));
        let plan = plan_uncapped(constraints);

        let Some((attempt, hits)) = self
            .first_nonempty(&constraints.search_query, top_k, plan)
            .await?
        else {
            return Err(MatchError::NotFound);
        };

        let hit = hits.into_iter().next().ok_or(MatchError::NotFound)?;

        Ok(BestMatch {
            hit,
            used_cap: None,
            used_tier: attempt.tier,
        })
    }

    /// Find the best breed and explain the match
    pub async fn recommend(
        &self,
        constraints: &PreferenceConstraints,
    ) -> Result<(Recommendation, BestMatch), MatchError> {
        let best = self.find_best_match(constraints).await?;
        let recommendation = build_recommendation(constraints, &best.hit);

        tracing::info!(
            "Recommended {} (score {}, cap {}, tier {})",
            recommendation.profile.breed,
            recommendation.match_score,
            best.used_cap.map_or("any".to_string(), |c| c.to_string()),
            best.used_tier
        );

        Ok((recommendation, best))
    }

    /// Look up one breed by name
    pub async fn fetch_breed(&self, name: &str) -> Result<BreedRecord, MatchError> {
        self.backend.fetch(name).await?.ok_or(MatchError::NotFound)
    }

    /// Every breed name the index returns for a broad query
    ///
    /// Deduplicated, case preserved, sorted ascending.
    pub async fn list_breed_names(&self) -> Result<Vec<String>, MatchError> {
        let request = QueryRequest {
            text: CATALOG_QUERY.to_string(),
            top_k: self.settings.catalog_top_k,
            filter: None,
        };

        let names: BTreeSet<String> = self
            .backend
            .query(&request)
            .await?
            .into_iter()
            .map(|hit| hit.id)
            .filter(|id| !id.is_empty())
            .collect();

        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend answering queries from a script, in call order
    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<Vec<SearchHit>, SearchError>>>,
        requests: Mutex<Vec<QueryRequest>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<Vec<SearchHit>, SearchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<QueryRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        async fn query(&self, request: &QueryRequest) -> Result<Vec<SearchHit>, SearchError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
        }

        async fn fetch(&self, _id: &str) -> Result<Option<BreedRecord>, SearchError> {
            Ok(None)
        }
    }

    fn create_hit(breed: &str, popularity: Option<i64>, score: f64) -> SearchHit {
        SearchHit {
            id: breed.to_string(),
            score,
            record: BreedRecord {
                breed: breed.to_string(),
                popularity,
                ..Default::default()
            },
        }
    }

    fn create_constraints() -> PreferenceConstraints {
        let mut constraints = PreferenceConstraints::new("friendly large dog");
        constraints.temperament_tags = vec!["friendly".to_string()];
        constraints.weight_min_kg = Some(22.0);
        constraints
    }

    #[tokio::test]
    async fn test_first_attempt_wins() {
        let backend = ScriptedBackend::new(vec![Ok(vec![
            create_hit("Vizsla", Some(31), 0.9),
            create_hit("Labrador Retriever", Some(2), 0.6),
        ])]);
        let matcher = BreedMatcher::with_default_settings(backend.clone());

        let best = matcher.find_best_match(&create_constraints()).await.unwrap();

        assert_eq!(best.hit.id, "Labrador Retriever");
        assert_eq!((best.used_cap, best.used_tier), (Some(50), 1));

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].top_k, 8);
        assert_eq!(requests[0].text, "friendly large dog");
    }

    #[tokio::test]
    async fn test_widens_cap_after_exhausting_tiers() {
        let mut script: Vec<Result<Vec<SearchHit>, SearchError>> =
            (0..TIER_COUNT).map(|_| Ok(Vec::new())).collect();
        script.push(Ok(vec![
            create_hit("Weimaraner", Some(95), 0.8),
            create_hit("Bernese Mountain Dog", Some(80), 0.7),
        ]));
        let backend = ScriptedBackend::new(script);
        let matcher = BreedMatcher::with_default_settings(backend.clone());

        let best = matcher.find_best_match(&create_constraints()).await.unwrap();

        assert_eq!(best.hit.id, "Bernese Mountain Dog");
        assert_eq!((best.used_cap, best.used_tier), (Some(100), 1));
        assert_eq!(backend.requests().len(), TIER_COUNT + 1);
    }

    #[tokio::test]
    async fn test_not_found_after_every_attempt() {
        let backend = ScriptedBackend::new(Vec::new());
        let matcher = BreedMatcher::with_default_settings(backend.clone());

        let result = matcher.find_best_match(&create_constraints()).await;

        assert!(matches!(result, Err(MatchError::NotFound)));
        assert_eq!(backend.requests().len(), DEFAULT_POPULARITY_CAPS.len() * TIER_COUNT);
        let last = backend.requests().pop().unwrap();
        assert!(last.filter.is_none());
    }

    #[tokio::test]
    async fn test_backend_error_aborts() {
        let backend = ScriptedBackend::new(vec![
            Ok(Vec::new()),
            Err(SearchError::InvalidResponse("timeout".into())),
            Ok(vec![create_hit("Pug", Some(30), 0.5)]),
        ]);
        let matcher = BreedMatcher::with_default_settings(backend.clone());

        let result = matcher.find_best_match(&create_constraints()).await;

        assert!(matches!(result, Err(MatchError::Backend(_))));
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_quick_search_takes_first_hit_without_caps() {
        let backend = ScriptedBackend::new(vec![
            Ok(Vec::new()),
            Ok(vec![create_hit("Otterhound", None, 0.4)]),
        ]);
        let matcher = BreedMatcher::with_default_settings(backend.clone());

        let best = matcher.quick_search(&create_constraints(), None).await.unwrap();

        assert_eq!(best.hit.id, "Otterhound");
        assert_eq!((best.used_cap, best.used_tier), (None, 2));

        let requests = backend.requests();
        assert!(requests.iter().all(|r| r.top_k == 1));
        assert!(requests
            .iter()
            .filter_map(|r| r.filter.as_ref())
            .all(|f| !f.to_string().contains("popularity")));
    }

    #[tokio::test]
    async fn test_quick_search_bounds_top_k() {
        let backend = ScriptedBackend::new(vec![
            Ok(vec![create_hit("Pug", Some(32), 0.9)]),
            Ok(vec![create_hit("Pug", Some(32), 0.9)]),
        ]);
        let matcher = BreedMatcher::with_default_settings(backend.clone());

        matcher.quick_search(&create_constraints(), Some(10_000)).await.unwrap();
        matcher.quick_search(&create_constraints(), Some(0)).await.unwrap();

        let top_ks: Vec<usize> = backend.requests().iter().map(|r| r.top_k).collect();
        assert_eq!(top_ks, vec![300, 1]);
    }

    #[tokio::test]
    async fn test_list_breed_names_sorted_unique() {
        let backend = ScriptedBackend::new(vec![Ok(vec![
            create_hit("Pug", Some(30), 0.5),
            create_hit("Beagle", Some(7), 0.4),
            create_hit("Pug", Some(30), 0.3),
            create_hit("affenpinscher", Some(140), 0.2),
        ])]);
        let matcher = BreedMatcher::with_default_settings(backend.clone());

        let names = matcher.list_breed_names().await.unwrap();

        assert_eq!(names, vec!["Beagle", "Pug", "affenpinscher"]);
        assert_eq!(backend.requests()[0].top_k, 300);
    }

    #[tokio::test]
    async fn test_fetch_unknown_breed() {
        let matcher = BreedMatcher::with_default_settings(ScriptedBackend::new(Vec::new()));
        assert!(matches!(matcher.fetch_breed("Nope").await, Err(MatchError::NotFound)));
    }
}
