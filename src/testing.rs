use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use sea_orm::DbErr;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    cache::{KeyValueCache, SqlCache},
    db,
    error::{CacheError, IndexError},
    search::{DocumentSearchIndex, SearchPage, SearchRequest},
};

pub async fn sql_cache() -> SqlCache {
    SqlCache::new(db::connect_and_migrate("sqlite::memory:").await.unwrap())
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Duration)>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryCache {
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_raw(&self, key: &str, payload: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (payload.to_string(), Duration::from_secs(60)));
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).map(|(payload, _)| payload.clone())
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Store(DbErr::Custom("cache offline".to_string())));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().unwrap().insert(key.to_string(), (payload.to_string(), ttl));
        self.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IndexCall {
    GetByIds { index: String, ids: Vec<Uuid> },
    Search { index: String, request: SearchRequest },
    MultiSearch { index: String, requests: Vec<SearchRequest> },
}

// Sort clauses are recorded but not applied.
#[derive(Default)]
pub struct MockIndex {
    docs: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<IndexCall>>,
    failing: AtomicBool,
}

impl MockIndex {
    pub fn insert(&self, index: &str, doc: Value) {
        self.docs.lock().unwrap().entry(index.to_string()).or_default().push(doc);
    }

    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn mget_calls(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, IndexCall::GetByIds { .. })).count()
    }

    pub fn msearch_calls(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, IndexCall::MultiSearch { .. })).count()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, call: IndexCall) -> Result<(), IndexError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(IndexError::Status { status: 503, body: "index offline".to_string() });
        }
        Ok(())
    }

    fn matching(&self, index: &str, request: &SearchRequest) -> SearchPage {
        let docs = self.docs.lock().unwrap();
        let ids: Vec<Uuid> = docs
            .get(index)
            .into_iter()
            .flatten()
            .filter(|doc| request.query.as_ref().is_none_or(|q| matches_query(doc, q)))
            .filter_map(doc_id)
            .collect();
        let total = ids.len() as u64;
        let ids = ids.into_iter().skip(request.from as usize).take(request.size as usize).collect();
        SearchPage { total, ids }
    }
}

#[async_trait]
impl DocumentSearchIndex for MockIndex {
    async fn get_by_ids(&self, index: &str, ids: &[Uuid]) -> Result<Vec<Value>, IndexError> {
        self.record(IndexCall::GetByIds { index: index.to_string(), ids: ids.to_vec() })?;
        let docs = self.docs.lock().unwrap();
        let stored = docs.get(index).map(Vec::as_slice).unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| stored.iter().find(|doc| doc_id(doc) == Some(*id)).cloned())
            .collect())
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchPage, IndexError> {
        self.record(IndexCall::Search { index: index.to_string(), request: request.clone() })?;
        Ok(self.matching(index, request))
    }

    async fn multi_search(
        &self,
        index: &str,
        requests: &[SearchRequest],
    ) -> Result<Vec<Vec<Uuid>>, IndexError> {
        self.record(IndexCall::MultiSearch { index: index.to_string(), requests: requests.to_vec() })?;
        Ok(requests.iter().map(|r| self.matching(index, r).ids).collect())
    }
}

fn doc_id(doc: &Value) -> Option<Uuid> {
    doc.get("id").and_then(Value::as_str).and_then(|id| Uuid::parse_str(id).ok())
}

fn matches_query(doc: &Value, query: &Value) -> bool {
    if query.get("match_all").is_some() {
        return true;
    }
    if let Some(nested) = query.get("nested") {
        let path = nested["path"].as_str().unwrap_or_default();
        let wanted = &nested["query"]["match"][format!("{path}.id")];
        return doc[path]
            .as_array()
            .is_some_and(|items| items.iter().any(|item| &item["id"] == wanted));
    }
    if let Some(multi) = query.get("multi_match") {
        let text = multi["query"].as_str().unwrap_or_default();
        return multi["fields"].as_array().into_iter().flatten().filter_map(Value::as_str).any(
            |field| {
                let field = field.split('^').next().unwrap_or(field);
                field_contains(&doc[field], text)
            },
        );
    }
    if let Some(Value::Object(fields)) = query.get("match") {
        return fields.iter().any(|(field, spec)| {
            let text = spec.get("query").unwrap_or(spec).as_str().unwrap_or_default();
            field_contains(&doc[field.as_str()], text)
        });
    }
    false
}

fn field_contains(value: &Value, text: &str) -> bool {
    let text = text.to_lowercase();
    match value {
        Value::String(s) => s.to_lowercase().contains(&text),
        Value::Array(items) => items.iter().any(|item| field_contains(item, &text)),
        _ => false,
    }
}
