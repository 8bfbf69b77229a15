use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
    cache::EntityCache,
    catalog::{Catalog, Listing},
    error::CatalogResult,
    models::{Film, RoleFilms},
    query::{
        FilterSpec, Page, QueryBuilder, Role, SortOrder, SortSpec, multi_match, nested_match,
    },
    search::{DocumentSearchIndex, SearchRequest},
};

/// Upper bound on films returned per role for one person.
const ROLE_FILMS_LIMIT: u64 = 1000;

const SEARCH_FIELDS: &[&str] =
    &["title^3", "description", "actors_names", "writers_names", "directors_names"];

pub struct FilmQueries;

impl FilmQueries {
    pub const SORT_FIELDS: &'static [&'static str] = &["imdb_rating", "title"];

    pub fn default_sort() -> SortSpec {
        SortSpec::new("imdb_rating", SortOrder::Desc)
    }
}

impl QueryBuilder for FilmQueries {
    fn sort_spec(&self, raw: Option<&str>) -> Option<SortSpec> {
        Some(SortSpec::parse(raw, Self::SORT_FIELDS, Self::default_sort()))
    }

    // `title` is analysed text in the index; sorting uses its keyword subfield.
    fn sort_clause(&self, sort: &SortSpec) -> Value {
        match sort.attr.as_str() {
            "title" => SortSpec::new("title.raw", sort.order).to_index(),
            _ => sort.to_index(),
        }
    }

    fn filter_query(&self, filter: &FilterSpec) -> Option<Value> {
        Some(filter.to_index())
    }

    fn search_query(&self, text: &str) -> Option<Value> {
        Some(multi_match(text, SEARCH_FIELDS))
    }
}

pub struct FilmCatalog {
    catalog: Catalog<Film, FilmQueries>,
}

impl FilmCatalog {
    pub fn new(
        index: Arc<dyn DocumentSearchIndex>,
        index_name: impl Into<String>,
        cache: EntityCache<Film>,
    ) -> Self {
        Self { catalog: Catalog::new(index, index_name, cache, FilmQueries) }
    }

    pub fn sort_spec(&self, raw: Option<&str>) -> SortSpec {
        self.catalog.queries().sort_spec(raw).unwrap_or_else(FilmQueries::default_sort)
    }

    pub async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Film>> {
        self.catalog.get_by_id(id).await
    }

    pub async fn get_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Film>> {
        self.catalog.get_by_ids(ids).await
    }

    pub async fn list(
        &self,
        page: Page,
        sort: &SortSpec,
        filter: Option<&FilterSpec>,
    ) -> CatalogResult<Listing<Film>> {
        self.catalog.list(page, Some(sort), filter).await
    }

    pub async fn search(&self, text: &str, page: Page) -> CatalogResult<Vec<Film>> {
        self.catalog.search(text, page).await
    }

    /// Duplicates are removed within a role only, so a film the person both
    /// directed and acted in appears under both roles.
    pub async fn get_by_person_id(&self, person_id: Uuid) -> CatalogResult<RoleFilms> {
        let person = person_id.to_string();
        let requests: Vec<SearchRequest> = Role::ALL
            .iter()
            .map(|role| SearchRequest {
                query: Some(nested_match(role.collection(), &person)),
                sort: None,
                from: 0,
                size: ROLE_FILMS_LIMIT,
            })
            .collect();

        let per_role = self.catalog.multi_search(&requests).await?;

        let all_ids: Vec<Uuid> = per_role.iter().flatten().copied().collect();
        let films: HashMap<Uuid, Film> =
            self.catalog.get_by_ids(&all_ids).await?.into_iter().map(|f| (f.id, f)).collect();

        let mut out = RoleFilms::default();
        for (role, ids) in Role::ALL.into_iter().zip(per_role) {
            let mut seen = HashSet::new();
            let role_films: Vec<Film> = ids
                .into_iter()
                .filter(|id| seen.insert(*id))
                .filter_map(|id| films.get(&id).cloned())
                .collect();
            debug!(person_id = %person_id, role = ?role, films = role_films.len(), "resolved role");
            out.set(role, role_films);
        }
        Ok(out)
    }
}
