use dashmap::DashMap;
use quadsql_common::error::StorageError;
use quadsql_common::QuadStore;
use quadsql_model::{SpaceId, TermId, TermKey};
use quadsql_translation::ResolvedTerms;
use std::collections::HashMap;
use std::sync::Arc;

type SpaceCache = Arc<DashMap<TermKey, TermId>>;

/// Resolves term keys into term ids, caching the ids it has seen.
///
/// Only hits are cached: a term that is missing now may be inserted later. Term ids never change
/// once assigned, so cached entries stay valid.
#[derive(Debug, Default)]
pub struct TermResolver {
    cache: DashMap<SpaceId, SpaceCache>,
}

impl TermResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `keys` with at most one call to the store.
    pub async fn resolve(
        &self,
        store: &dyn QuadStore,
        space: &SpaceId,
        keys: impl IntoIterator<Item = TermKey>,
    ) -> Result<ResolvedTerms, StorageError> {
        let cache = self.space_cache(space);
        let mut ids = HashMap::new();
        let mut missing = Vec::new();
        for key in keys {
            match cache.get(&key) {
                Some(id) => {
                    ids.insert(key, *id);
                }
                None => missing.push(key),
            }
        }

        if !missing.is_empty() {
            let found = store.resolve_terms_batch(space, &missing).await?;
            tracing::debug!(
                space = %space,
                cached = ids.len(),
                requested = missing.len(),
                found = found.len(),
                "Resolved terms"
            );
            for (key, id) in found {
                cache.insert(key.clone(), id);
                ids.insert(key, id);
            }
        }
        Ok(ResolvedTerms::new(ids))
    }

    /// Returns the number of cached ids of `space`.
    pub fn cached(&self, space: &SpaceId) -> usize {
        self.cache.get(space).map_or(0, |cache| cache.len())
    }

    /// Drops every cached id.
    pub fn clear(&self) {
        self.cache.clear();
    }

    fn space_cache(&self, space: &SpaceId) -> SpaceCache {
        Arc::clone(self.cache.entry(space.clone()).or_default().value())
    }
}
