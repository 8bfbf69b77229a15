use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    cache::EntityCache,
    catalog::{Catalog, Listing},
    error::CatalogResult,
    models::Person,
    query::{Page, QueryBuilder, fuzzy_match},
    search::DocumentSearchIndex,
};

pub struct PersonQueries;

impl QueryBuilder for PersonQueries {
    fn search_query(&self, text: &str) -> Option<Value> {
        Some(fuzzy_match("name", text))
    }
}

pub struct PersonCatalog {
    catalog: Catalog<Person, PersonQueries>,
}

impl PersonCatalog {
    pub fn new(
        index: Arc<dyn DocumentSearchIndex>,
        index_name: impl Into<String>,
        cache: EntityCache<Person>,
    ) -> Self {
        Self { catalog: Catalog::new(index, index_name, cache, PersonQueries) }
    }

    pub async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Person>> {
        self.catalog.get_by_id(id).await
    }

    pub async fn get_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Person>> {
        self.catalog.get_by_ids(ids).await
    }

    pub async fn list(&self, page: Page) -> CatalogResult<Listing<Person>> {
        self.catalog.list(page, None, None).await
    }

    pub async fn search(&self, text: &str, page: Page) -> CatalogResult<Vec<Person>> {
        self.catalog.search(text, page).await
    }
}
