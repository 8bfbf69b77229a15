use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use uuid::Uuid;
use wreq::header::CONTENT_TYPE;

use crate::error::IndexError;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchRequest {
    pub query: Option<Value>,
    pub sort: Option<Value>,
    pub from: u64,
    pub size: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchPage {
    /// Total number of documents matching the query, not just this page.
    pub total: u64,
    pub ids: Vec<Uuid>,
}

#[async_trait]
pub trait DocumentSearchIndex: Send + Sync {
    async fn get_by_ids(&self, index: &str, ids: &[Uuid]) -> Result<Vec<Value>, IndexError>;

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchPage, IndexError>;

    /// Result sets come back in query order.
    async fn multi_search(
        &self,
        index: &str,
        requests: &[SearchRequest],
    ) -> Result<Vec<Vec<Uuid>>, IndexError>;
}

pub struct ElasticClient {
    client: wreq::Client,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl ElasticClient {
    pub fn new(client: wreq::Client, base_url: String, rps: u32) -> Self {
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, base_url, limiter }
    }

    fn url(&self, index: &str, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), index, endpoint)
    }

    async fn post_json(&self, url: String, body: &Value) -> Result<Value, IndexError> {
        self.limiter.until_ready().await;
        let resp = self.client.post(url).json(body).send().await?;
        read_json(resp).await
    }
}

#[async_trait]
impl DocumentSearchIndex for ElasticClient {
    async fn get_by_ids(&self, index: &str, ids: &[Uuid]) -> Result<Vec<Value>, IndexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!(index = %index, count = ids.len(), "mget");
        let resp = self.post_json(self.url(index, "_mget"), &mget_body(ids)).await?;
        parse_mget(resp)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchPage, IndexError> {
        debug!(index = %index, from = request.from, size = request.size, "search");
        let resp = self.post_json(self.url(index, "_search"), &search_body(request)).await?;
        parse_hits(&resp)
    }

    async fn multi_search(
        &self,
        index: &str,
        requests: &[SearchRequest],
    ) -> Result<Vec<Vec<Uuid>>, IndexError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        debug!(index = %index, queries = requests.len(), "msearch");
        self.limiter.until_ready().await;
        let resp = self
            .client
            .post(self.url(index, "_msearch"))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(msearch_body(requests))
            .send()
            .await?;
        parse_msearch(read_json(resp).await?, requests.len())
    }
}

async fn read_json(resp: wreq::Response) -> Result<Value, IndexError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(IndexError::Status { status: status.as_u16(), body });
    }
    Ok(resp.json().await?)
}

fn mget_body(ids: &[Uuid]) -> Value {
    json!({ "ids": ids })
}

/// Found documents only, in request order. The document id is copied into
/// the source when the source does not carry it.
fn parse_mget(resp: Value) -> Result<Vec<Value>, IndexError> {
    let Some(Value::Array(docs)) = resp.get("docs").cloned() else {
        return Err(IndexError::Decode("mget response without `docs`".to_string()));
    };

    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        if !doc.get("found").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        let Some(Value::Object(mut source)) = doc.get("_source").cloned() else {
            continue;
        };
        if !source.contains_key("id") {
            if let Some(id) = doc.get("_id") {
                source.insert("id".to_string(), id.clone());
            }
        }
        out.push(Value::Object(source));
    }
    Ok(out)
}

fn search_body(request: &SearchRequest) -> Value {
    let mut body = Map::new();
    body.insert("_source".to_string(), Value::Bool(false));
    body.insert("from".to_string(), json!(request.from));
    body.insert("size".to_string(), json!(request.size));
    body.insert("track_total_hits".to_string(), Value::Bool(true));
    if let Some(query) = &request.query {
        body.insert("query".to_string(), query.clone());
    }
    if let Some(sort) = &request.sort {
        body.insert("sort".to_string(), sort.clone());
    }
    Value::Object(body)
}

fn msearch_body(requests: &[SearchRequest]) -> String {
    let mut body = String::new();
    for request in requests {
        body.push_str("{}\n");
        body.push_str(&search_body(request).to_string());
        body.push('\n');
    }
    body
}

fn parse_hits(resp: &Value) -> Result<SearchPage, IndexError> {
    let hits = resp
        .get("hits")
        .ok_or_else(|| IndexError::Decode("search response without `hits`".to_string()))?;

    let ids: Vec<Uuid> = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("_id").and_then(Value::as_str))
                .filter_map(|id| match Uuid::parse_str(id) {
                    Ok(id) => Some(id),
                    Err(_) => {
                        warn!(id = %id, "skipping document with non-uuid id");
                        None
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    // `hits.total` is an object since Elasticsearch 7, a bare number before.
    let total = match hits.get("total") {
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
        Some(total) => total.as_u64(),
        None => None,
    }
    .unwrap_or(ids.len() as u64);

    Ok(SearchPage { total, ids })
}

fn parse_msearch(resp: Value, expected: usize) -> Result<Vec<Vec<Uuid>>, IndexError> {
    let Some(Value::Array(responses)) = resp.get("responses").cloned() else {
        return Err(IndexError::Decode("msearch response without `responses`".to_string()));
    };
    if responses.len() != expected {
        return Err(IndexError::Decode(format!(
            "msearch returned {} result sets for {expected} queries",
            responses.len()
        )));
    }

    responses
        .iter()
        .map(|resp| {
            if let Some(error) = resp.get("error") {
                let status = resp.get("status").and_then(Value::as_u64).unwrap_or(500) as u16;
                return Err(IndexError::Status { status, body: error.to_string() });
            }
            parse_hits(resp).map(|page| page.ids)
        })
        .collect()
}
