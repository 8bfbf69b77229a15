use std::sync::Arc;

use uuid::Uuid;

use crate::{
    cache::EntityCache,
    catalog::{Catalog, Listing},
    error::CatalogResult,
    models::Genre,
    query::{Page, QueryBuilder, SortOrder, SortSpec},
    search::DocumentSearchIndex,
};

/// Genres are listed by id and cannot be filtered, re-sorted or searched.
pub struct GenreQueries;

impl GenreQueries {
    pub fn id_order() -> SortSpec {
        SortSpec::new("id", SortOrder::Asc)
    }
}

impl QueryBuilder for GenreQueries {}

pub struct GenreCatalog {
    catalog: Catalog<Genre, GenreQueries>,
}

impl GenreCatalog {
    pub fn new(
        index: Arc<dyn DocumentSearchIndex>,
        index_name: impl Into<String>,
        cache: EntityCache<Genre>,
    ) -> Self {
        Self { catalog: Catalog::new(index, index_name, cache, GenreQueries) }
    }

    pub async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Genre>> {
        self.catalog.get_by_id(id).await
    }

    pub async fn get_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Genre>> {
        self.catalog.get_by_ids(ids).await
    }

    pub async fn list(&self, page: Page) -> CatalogResult<Listing<Genre>> {
        self.catalog.list(page, Some(&GenreQueries::id_order()), None).await
    }
}
