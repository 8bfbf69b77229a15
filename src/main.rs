mod cache;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod films;
mod genres;
mod models;
mod persons;
mod query;
mod routes;
mod search;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    cache::{EntityCache, KeyValueCache, SqlCache},
    config::Config,
    films::FilmCatalog,
    genres::GenreCatalog,
    persons::PersonCatalog,
    search::{DocumentSearchIndex, ElasticClient},
};

pub struct AppState {
    pub config: Arc<Config>,
    pub films: FilmCatalog,
    pub genres: GenreCatalog,
    pub persons: PersonCatalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinedex=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    let sql_cache = SqlCache::new(db);
    spawn_cache_purge(sql_cache.clone(), config.cache_purge_interval);
    let cache: Arc<dyn KeyValueCache> = Arc::new(sql_cache);

    let http = wreq::Client::builder().timeout(config.elastic_timeout).build()?;
    let index: Arc<dyn DocumentSearchIndex> =
        Arc::new(ElasticClient::new(http, config.elastic_url.clone(), config.elastic_rps));

    let state = Arc::new(AppState {
        films: FilmCatalog::new(
            index.clone(),
            config.films_index.clone(),
            EntityCache::new(cache.clone(), config.cache_ttl),
        ),
        genres: GenreCatalog::new(
            index.clone(),
            config.genres_index.clone(),
            EntityCache::new(cache.clone(), config.cache_ttl),
        ),
        persons: PersonCatalog::new(
            index,
            config.persons_index.clone(),
            EntityCache::new(cache, config.cache_ttl),
        ),
        config: config.clone(),
    });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, elastic = %config.elastic_url, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_cache_purge(cache: SqlCache, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match cache.purge_expired().await {
                Ok(0) => {},
                Ok(purged) => tracing::debug!(purged, "purged expired cache entries"),
                Err(err) => tracing::warn!(error = %err, "cache purge failed"),
            }
        }
    });
}
