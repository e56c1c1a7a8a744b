use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use derive_more::Display;
use stash_inspect::{ActiveDatabase, Row};
use time::OffsetDateTime;

use crate::observer::{RequestEvent, RequestLog};

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub db: ActiveDatabase,
    pub log: RequestLog,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/{table}/{id}", get(lookup))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.log.clone(), record_request))
        .with_state(state)
}

/// Failure of a single lookup, rendered as `{"error": "..."}`.
#[derive(Debug, Display)]
pub(crate) enum QueryError {
    #[display("Not found")]
    NotFound,
    #[display("{_0}")]
    Failed(String),
}

impl From<stash_inspect::error::Error> for QueryError {
    fn from(err: stash_inspect::error::Error) -> Self {
        Self::Failed((*err).to_string())
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Failed(message) => {
                tracing::warn!(%message, "Lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

async fn lookup(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Row>, QueryError> {
    let inspector = state.db.current().await?;
    match inspector.lookup(&table, &id).await? {
        Some(row) => Ok(Json(row)),
        None => Err(QueryError::NotFound),
    }
}

async fn not_found() -> QueryError {
    QueryError::NotFound
}

async fn record_request(State(log): State<RequestLog>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let url = request
        .uri()
        .path_and_query()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let response = next.run(request).await;
    log.publish(RequestEvent {
        time: OffsetDateTime::now_utc(),
        method,
        url,
        status: response.status().as_u16(),
    });
    response
}
