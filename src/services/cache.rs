use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const BREED_NAMES_KEY: &str = "breed_names";

/// In-process cache for the breed name catalog
///
/// The catalog is a large unfiltered query whose answer only changes when
/// the index is re-ingested. Recommendation searches are never cached.
pub struct CatalogCache {
    entries: Cache<&'static str, Arc<Vec<String>>>,
}

impl CatalogCache {
    pub fn new(ttl_secs: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { entries }
    }

    /// Cached breed names, loading them on a miss
    ///
    /// Empty catalogs are returned but not cached.
    pub async fn breed_names<F, Fut, E>(&self, load: F) -> Result<Arc<Vec<String>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
    {
        if let Some(names) = self.entries.get(BREED_NAMES_KEY).await {
            tracing::trace!("Catalog cache hit");
            return Ok(names);
        }

        let names = Arc::new(load().await?);
        if !names.is_empty() {
            self.entries.insert(BREED_NAMES_KEY, names.clone()).await;
        }

        tracing::trace!("Catalog cache miss, loaded {} names", names.len());
        Ok(names)
    }

    pub async fn invalidate(&self) {
        self.entries.invalidate(BREED_NAMES_KEY).await;
    }
}
