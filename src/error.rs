use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(#[from] sea_orm::DbErr),
    #[error("cache payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("search index unreachable: {0}")]
    Transport(#[from] wreq::Error),
    #[error("search index returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected search index response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("document in index `{index}` does not match the {kind} schema: {source}")]
    Document {
        index: String,
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn not_found(kind: &str) -> Self {
        Self(anyhow::Error::new(NotFound(format!("{kind} not found"))))
    }

    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<NotFound>().is_some() {
            StatusCode::NOT_FOUND
        } else if let Some(CatalogError::Index(_)) = self.0.downcast_ref::<CatalogError>() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct NotFound(String);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
