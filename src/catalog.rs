use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    cache::EntityCache,
    error::{CatalogError, CatalogResult},
    models::CatalogEntity,
    query::{FilterSpec, Page, QueryBuilder, SortSpec},
    search::{DocumentSearchIndex, SearchRequest},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Listing<T> {
    pub total: u64,
    pub pages: u64,
    pub items: Vec<T>,
}

pub struct Catalog<T, Q> {
    index: Arc<dyn DocumentSearchIndex>,
    index_name: String,
    cache: EntityCache<T>,
    queries: Q,
}

impl<T: CatalogEntity, Q: QueryBuilder> Catalog<T, Q> {
    pub fn new(
        index: Arc<dyn DocumentSearchIndex>,
        index_name: impl Into<String>,
        cache: EntityCache<T>,
        queries: Q,
    ) -> Self {
        Self { index, index_name: index_name.into(), cache, queries }
    }

    pub fn queries(&self) -> &Q {
        &self.queries
    }

    /// Negative results are not cached.
    pub async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<T>> {
        if let Some(entity) = self.cached(id).await {
            debug!(kind = T::KIND, id = %id, "cache hit");
            return Ok(Some(entity));
        }

        let docs = self.index.get_by_ids(&self.index_name, &[id]).await?;
        let Some(doc) = docs.into_iter().next() else {
            debug!(kind = T::KIND, id = %id, "not found in index");
            return Ok(None);
        };

        let entity = self.decode(doc)?;
        self.store(&entity).await;
        Ok(Some(entity))
    }

    /// Materialises `ids` in first-occurrence order with duplicates removed.
    /// All cache misses are fetched with a single index call. Ids the index
    /// does not know, or whose documents do not decode, are dropped.
    pub async fn get_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<T>> {
        let mut seen = HashSet::with_capacity(ids.len());
        let order: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut found: HashMap<Uuid, T> = HashMap::with_capacity(order.len());
        let mut misses = Vec::new();
        for &id in &order {
            match self.cached(id).await {
                Some(entity) => {
                    found.insert(id, entity);
                },
                None => misses.push(id),
            }
        }

        debug!(kind = T::KIND, requested = order.len(), misses = misses.len(), "resolving batch");

        if !misses.is_empty() {
            let docs = self.index.get_by_ids(&self.index_name, &misses).await?;
            for doc in docs {
                let entity = match self.decode(doc) {
                    Ok(entity) => entity,
                    Err(err) => {
                        warn!(error = %err, "skipping undecodable document");
                        continue;
                    },
                };
                self.store(&entity).await;
                found.insert(entity.id(), entity);
            }
        }

        Ok(order.into_iter().filter_map(|id| found.remove(&id)).collect())
    }

    pub async fn list(
        &self,
        page: Page,
        sort: Option<&SortSpec>,
        filter: Option<&FilterSpec>,
    ) -> CatalogResult<Listing<T>> {
        let request = SearchRequest {
            query: filter.and_then(|f| self.queries.filter_query(f)),
            sort: sort.map(|s| self.queries.sort_clause(s)),
            from: page.offset(),
            size: page.limit(),
        };
        let hits = self.index.search(&self.index_name, &request).await?;
        let items = self.get_by_ids(&hits.ids).await?;

        Ok(Listing { total: hits.total, pages: page.total_pages(hits.total), items })
    }

    pub async fn search(&self, text: &str, page: Page) -> CatalogResult<Vec<T>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let Some(query) = self.queries.search_query(text) else {
            return Ok(Vec::new());
        };

        let request =
            SearchRequest { query: Some(query), sort: None, from: page.offset(), size: page.limit() };
        let hits = self.index.search(&self.index_name, &request).await?;
        debug!(kind = T::KIND, query = %text, hits = hits.ids.len(), "search");
        self.get_by_ids(&hits.ids).await
    }

    pub async fn multi_search(&self, requests: &[SearchRequest]) -> CatalogResult<Vec<Vec<Uuid>>> {
        Ok(self.index.multi_search(&self.index_name, requests).await?)
    }

    async fn cached(&self, id: Uuid) -> Option<T> {
        match self.cache.get(id).await {
            Ok(entity) => entity,
            Err(err) => {
                warn!(kind = T::KIND, id = %id, error = %err, "cache read failed, treating as miss");
                None
            },
        }
    }

    async fn store(&self, entity: &T) {
        if let Err(err) = self.cache.put(entity).await {
            warn!(kind = T::KIND, id = %entity.id(), error = %err, "cache write failed");
        }
    }

    fn decode(&self, doc: Value) -> CatalogResult<T> {
        serde_json::from_value(doc).map_err(|source| CatalogError::Document {
            index: self.index_name.clone(),
            kind: T::KIND,
            source,
        })
    }
}
