use std::{marker::PhantomData, sync::Arc, time::Duration};

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{entities::cache_entry, error::CacheError, models::CatalogEntity};

#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct SqlCache {
    db: DatabaseConnection,
}

impl SqlCache {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let res = cache_entry::Entity::delete_many()
            .filter(cache_entry::Column::ExpiresAt.lte(now_sec()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl KeyValueCache for SqlCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entry = cache_entry::Entity::find_by_id(key.to_string()).one(&self.db).await?;
        Ok(entry.filter(|e| e.expires_at > now_sec()).map(|e| e.payload))
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        let model = cache_entry::ActiveModel {
            key: Set(key.to_string()),
            payload: Set(payload.to_string()),
            expires_at: Set(now_sec().saturating_add(ttl.as_secs() as i64)),
        };

        cache_entry::Entity::insert(model)
            .on_conflict(
                OnConflict::column(cache_entry::Column::Key)
                    .update_columns([cache_entry::Column::Payload, cache_entry::Column::ExpiresAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }
}

/// Keys are namespaced as `"<kind>:<id>"`.
pub struct EntityCache<T> {
    store: Arc<dyn KeyValueCache>,
    ttl: Duration,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), ttl: self.ttl, _entity: PhantomData }
    }
}

impl<T: CatalogEntity> EntityCache<T> {
    pub fn new(store: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { store, ttl, _entity: PhantomData }
    }

    pub fn key(id: Uuid) -> String {
        format!("{}:{id}", T::KIND)
    }

    /// A payload that no longer decodes is reported as a miss; the next
    /// successful index fetch overwrites it.
    pub async fn get(&self, id: Uuid) -> Result<Option<T>, CacheError> {
        let key = Self::key(id);
        let Some(payload) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(entity) => Ok(Some(entity)),
            Err(err) => {
                warn!(key = %key, error = %err, "discarding malformed cache payload");
                Ok(None)
            },
        }
    }

    pub async fn put(&self, entity: &T) -> Result<(), CacheError> {
        let key = Self::key(entity.id());
        let payload = serde_json::to_string(entity)?;
        self.store.set(&key, &payload, self.ttl).await?;
        debug!(key = %key, ttl_secs = self.ttl.as_secs(), "cached entity");
        Ok(())
    }
}

pub fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
