use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub cache_ttl: Duration,
    pub cache_purge_interval: Duration,
    pub elastic_url: String,
    pub elastic_rps: u32,
    pub elastic_timeout: Duration,
    pub films_index: String,
    pub genres_index: String,
    pub persons_index: String,
    pub default_page_size: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinedex-cache.db?mode=rwc".to_string());

        let cache_ttl_seconds: u64 =
            std::env::var("CACHE_TTL_SECONDS").ok().and_then(|s| s.parse().ok()).unwrap_or(300);

        let cache_purge_seconds: u64 =
            std::env::var("CACHE_PURGE_SECONDS").ok().and_then(|s| s.parse().ok()).unwrap_or(600);

        let elastic_url = std::env::var("ELASTIC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:9200".to_string());

        let elastic_rps: u32 =
            std::env::var("ELASTIC_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(50);

        let elastic_timeout_secs: u64 =
            std::env::var("ELASTIC_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let default_page_size: u32 =
            std::env::var("DEFAULT_PAGE_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(50);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            cache_purge_interval: Duration::from_secs(cache_purge_seconds.max(1)),
            elastic_url,
            elastic_rps,
            elastic_timeout: Duration::from_secs(elastic_timeout_secs),
            films_index: std::env::var("FILMS_INDEX").unwrap_or_else(|_| "movies".to_string()),
            genres_index: std::env::var("GENRES_INDEX").unwrap_or_else(|_| "genres".to_string()),
            persons_index: std::env::var("PERSONS_INDEX").unwrap_or_else(|_| "persons".to_string()),
            default_page_size: default_page_size.max(1),
        })
    }
}
