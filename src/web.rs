use crate::app::{
    AppError, ContentRecord, ExtractResponse, HistoryEntry, IndexStats, Recommender, SimilarItem,
    SimilarRequest,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

/// Records listed by `/api/content`
const CONTENT_LIST_LIMIT: usize = 50;
/// Entries listed by `/api/history`
const HISTORY_LIST_LIMIT: usize = 20;

#[derive(Clone)]
struct SharedState {
    app: Arc<Recommender>,
}

pub fn router(app: Arc<Recommender>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract))
        .route("/recommend", post(recommend))
        .route("/similar", post(similar))
        .route("/api/content", get(contents))
        .route("/api/history", get(history))
        .route("/api/index", get(index_stats))
        .layer(tower_http::cors::CorsLayer::permissive())
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

async fn start_app(app: Arc<Recommender>) -> anyhow::Result<()> {
    let listen = app.config().listen.clone();

    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                log::error!("failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
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

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        log::warn!("shutting down");
    }

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    log::info!("listening on {listen}");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Serve until Ctrl-C or SIGTERM, then save the index.
///
/// The recommender owns blocking HTTP clients, so its last reference must be
/// dropped outside the runtime.
pub fn start_daemon(app: Recommender) -> anyhow::Result<()> {
    let app = Arc::new(app);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app.clone()))?;

    app.save_index()?;
    Ok(())
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AnalyzerUnavailable(_) => {
                log::error!("{self:?}");
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Index(_) | AppError::Snapshot(_) | AppError::IO(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
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

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: String,
}

async fn extract(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, HttpError> {
    let app = state.app.clone();

    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || app.extract(&payload.url))
        .map(Json)
        .map_err(Into::into)
}

async fn recommend() -> Json<serde_json::Value> {
    Json(json!({"message": "Use /extract endpoint"}))
}

async fn similar(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SimilarRequest>,
) -> Result<Json<Vec<SimilarItem>>, HttpError> {
    let app = state.app.clone();

    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || app.similar(payload))
        .map(Json)
        .map_err(Into::into)
}

async fn contents(State(state): State<Arc<SharedState>>) -> Json<Vec<ContentRecord>> {
    Json(state.app.contents(CONTENT_LIST_LIMIT))
}

async fn history(State(state): State<Arc<SharedState>>) -> Json<Vec<HistoryEntry>> {
    Json(state.app.history(HISTORY_LIST_LIMIT))
}

async fn index_stats(State(state): State<Arc<SharedState>>) -> Json<IndexStats> {
    Json(state.app.index_stats())
}
