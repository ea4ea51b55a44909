use crate::app::{AppError, CatalogService};
use crate::enrich::EnrichedItem;
use anyhow::Context;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    service: Arc<CatalogService>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    message: String,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: "ok".to_string(),
            data: Some(data),
        })
    }
}

pub fn router(service: Arc<CatalogService>) -> Router {
    let shared_state = Arc::new(SharedState { service });

    Router::new()
        .route("/api/health", get(health))
        .route("/api/search", get(search))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn start_app(service: Arc<CatalogService>, listen: &str) -> anyhow::Result<()> {
    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                log::error!("failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        };

        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(err) => {
                    log::error!("failed to install signal handler: {err}");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        log::warn!("shutting down");
    }

    let app = router(service);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    log::info!("listening on {listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(service: CatalogService, listen: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(Arc::new(service), listen).await })
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            AppError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::Corpus(_) | AppError::Config(_) | AppError::IO(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ApiResponse::<()> {
            success: false,
            message: self.0.to_string(),
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    time: String,
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    term: Option<String>,

    /// Kept as a string: anything that is not a number falls back to the
    /// configured page size instead of rejecting the request.
    item_count: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse<'a> {
    result: &'a [EnrichedItem],
    recommended_ad: Option<&'a EnrichedItem>,
}

/// Requested page size. Zero and negative counts ask for nothing, anything
/// that is not a number gets the default.
fn page_size(item_count: Option<&str>, default: usize) -> usize {
    match item_count.map(|count| count.trim().parse::<i64>()) {
        Some(Ok(count)) => usize::try_from(count).unwrap_or(0),
        _ => default,
    }
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Query(payload): Query<SearchRequest>,
) -> Result<axum::response::Response, HttpError> {
    log::debug!("payload: {payload:?}");

    let term = match payload.term.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => term.to_string(),
        _ => {
            return Err(AppError::InvalidRequest("search term is required".to_string()).into());
        }
    };

    let service = state.service.clone();
    let page_size = page_size(payload.item_count.as_deref(), service.default_page_size());

    let enrichment = service
        .search_and_enrich(&term, page_size, service.default_deadline())
        .await;

    // serialized here, so the records can go back to the pool
    let response = ApiResponse::ok(SearchResponse {
        result: &enrichment.items,
        recommended_ad: enrichment.recommendation.as_ref(),
    })
    .into_response();
    service.recycle(enrichment);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::CorpusError;

    #[test]
    fn test_page_size() {
        assert_eq!(page_size(Some("3"), 10), 3);
        assert_eq!(page_size(Some(" 7 "), 10), 7);
        assert_eq!(page_size(Some("0"), 10), 0);
        assert_eq!(page_size(Some("-1"), 10), 0);
        assert_eq!(page_size(Some("lots"), 10), 10);
        assert_eq!(page_size(Some(""), 10), 10);
        assert_eq!(page_size(None, 10), 10);
    }

    #[test]
    fn test_error_status() {
        let response = HttpError(AppError::InvalidRequest("no".to_string())).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);

        let response = HttpError(AppError::Corpus(CorpusError::DuplicateId(1))).into_response();
        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
