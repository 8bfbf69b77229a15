use std::{collections::HashSet, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    routing::get,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AppState,
    catalog::Listing,
    error::{AppError, AppResult},
    models::{Film, Genre, NamedRef, Person, RoleFilms},
    query::{FilterSpec, Page, QueryParams, Role},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/films", get(list_films))
        .route("/api/v1/films/search", get(search_films))
        .route("/api/v1/films/{film_id}", get(film_details))
        .route("/api/v1/genres", get(list_genres))
        .route("/api/v1/genres/{genre_id}", get(genre_details))
        .route("/api/v1/persons", get(list_persons))
        .route("/api/v1/persons/search", get(search_persons))
        .route("/api/v1/persons/{person_id}", get(person_details))
        .route("/api/v1/persons/{person_id}/film", get(person_films))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn params(raw: Option<String>) -> QueryParams {
    QueryParams::parse(raw.as_deref().unwrap_or_default())
}

pub async fn list_films(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<ListResponse<FilmShort>>> {
    let params = params(raw);
    let page = Page::from_query(&params, state.config.default_page_size);
    let sort = state.films.sort_spec(params.get("sort"));
    let filter = FilterSpec::from_query(&params);

    let listing = state.films.list(page, &sort, filter.as_ref()).await?;
    Ok(Json(ListResponse::from_listing(listing, |f| FilmShort::from(&f))))
}

pub async fn search_films(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<Vec<FilmShort>>> {
    let params = params(raw);
    let page = Page::from_query(&params, state.config.default_page_size);
    let films = state.films.search(params.get("query").unwrap_or_default(), page).await?;
    Ok(Json(films.iter().map(FilmShort::from).collect()))
}

pub async fn film_details(
    State(state): State<Arc<AppState>>,
    Path(film_id): Path<Uuid>,
) -> AppResult<Json<FilmDetail>> {
    let film = state.films.get_by_id(film_id).await?.ok_or_else(|| AppError::not_found("film"))?;
    Ok(Json(FilmDetail::from(film)))
}

pub async fn list_genres(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<ListResponse<GenreResponse>>> {
    let page = Page::from_query(&params(raw), state.config.default_page_size);
    let listing = state.genres.list(page).await?;
    Ok(Json(ListResponse::from_listing(listing, GenreResponse::from)))
}

pub async fn genre_details(
    State(state): State<Arc<AppState>>,
    Path(genre_id): Path<Uuid>,
) -> AppResult<Json<GenreResponse>> {
    let genre =
        state.genres.get_by_id(genre_id).await?.ok_or_else(|| AppError::not_found("genre"))?;
    Ok(Json(GenreResponse::from(genre)))
}

pub async fn list_persons(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<ListResponse<PersonShort>>> {
    let page = Page::from_query(&params(raw), state.config.default_page_size);
    let listing = state.persons.list(page).await?;
    Ok(Json(ListResponse::from_listing(listing, PersonShort::from)))
}

pub async fn search_persons(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<Vec<PersonDetail>>> {
    let params = params(raw);
    let page = Page::from_query(&params, state.config.default_page_size);
    let persons = state.persons.search(params.get("query").unwrap_or_default(), page).await?;

    let mut out = Vec::with_capacity(persons.len());
    for person in persons {
        let roles = state.films.get_by_person_id(person.id).await?;
        out.push(PersonDetail::new(person, &roles));
    }
    Ok(Json(out))
}

pub async fn person_details(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<Uuid>,
) -> AppResult<Json<PersonDetail>> {
    let person =
        state.persons.get_by_id(person_id).await?.ok_or_else(|| AppError::not_found("person"))?;
    let roles = state.films.get_by_person_id(person.id).await?;
    Ok(Json(PersonDetail::new(person, &roles)))
}

pub async fn person_films(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<Uuid>,
) -> AppResult<Json<Vec<FilmShort>>> {
    if state.persons.get_by_id(person_id).await?.is_none() {
        return Err(AppError::not_found("person"));
    }
    let roles = state.films.get_by_person_id(person_id).await?;

    let mut seen = HashSet::new();
    let films = Role::ALL
        .into_iter()
        .flat_map(|role| roles.get(role))
        .filter(|film| seen.insert(film.id))
        .map(FilmShort::from)
        .collect();
    Ok(Json(films))
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub total: u64,
    pub pages: u64,
    pub items: Vec<T>,
}

impl<T> ListResponse<T> {
    fn from_listing<E>(listing: Listing<E>, f: impl FnMut(E) -> T) -> Self {
        Self {
            total: listing.total,
            pages: listing.pages,
            items: listing.items.into_iter().map(f).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FilmShort {
    pub uuid: Uuid,
    pub title: String,
    pub imdb_rating: Option<f64>,
}

impl From<&Film> for FilmShort {
    fn from(film: &Film) -> Self {
        Self { uuid: film.id, title: film.title.clone(), imdb_rating: film.imdb_rating }
    }
}

#[derive(Debug, Serialize)]
pub struct RefResponse {
    pub uuid: Uuid,
    pub name: String,
}

impl From<NamedRef> for RefResponse {
    fn from(r: NamedRef) -> Self {
        Self { uuid: r.id, name: r.name }
    }
}

#[derive(Debug, Serialize)]
pub struct FilmDetail {
    pub uuid: Uuid,
    pub title: String,
    pub imdb_rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<RefResponse>,
    pub actors: Vec<RefResponse>,
    pub writers: Vec<RefResponse>,
    pub directors: Vec<RefResponse>,
}

impl From<Film> for FilmDetail {
    fn from(film: Film) -> Self {
        let refs = |v: Vec<NamedRef>| -> Vec<RefResponse> { v.into_iter().map(RefResponse::from).collect() };
        Self {
            uuid: film.id,
            title: film.title,
            imdb_rating: film.imdb_rating,
            description: film.description,
            genre: refs(film.genres),
            actors: refs(film.actors),
            writers: refs(film.writers),
            directors: refs(film.directors),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenreResponse {
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<Genre> for GenreResponse {
    fn from(genre: Genre) -> Self {
        Self { uuid: genre.id, name: genre.name, description: genre.description }
    }
}

#[derive(Debug, Serialize)]
pub struct PersonShort {
    pub uuid: Uuid,
    pub full_name: String,
}

impl From<Person> for PersonShort {
    fn from(person: Person) -> Self {
        Self { uuid: person.id, full_name: person.name }
    }
}

#[derive(Debug, Serialize)]
pub struct PersonDetail {
    pub uuid: Uuid,
    pub full_name: String,
    pub actor: Vec<Uuid>,
    pub writer: Vec<Uuid>,
    pub director: Vec<Uuid>,
}

impl PersonDetail {
    fn new(person: Person, roles: &RoleFilms) -> Self {
        Self {
            uuid: person.id,
            full_name: person.name,
            actor: roles.ids(Role::Actor),
            writer: roles.ids(Role::Writer),
            director: roles.ids(Role::Director),
        }
    }
}
