use crate::{
    app::{AppError, AppLocal, NoteView, Stats},
    config::Config,
    eid::Eid,
    notes::{Note, SearchQuery},
    related::Related,
};
use anyhow::Context;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<AppLocal>,
}

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

pub fn router(app: AppLocal) -> Router {
    let shared_state = Arc::new(SharedState { app: Arc::new(app) });

    Router::new()
        .route("/api/notes/search", post(search))
        .route("/api/notes/create", post(create))
        .route("/api/notes/update", post(update))
        .route("/api/notes/delete", post(delete))
        .route("/api/notes/show", post(show))
        .route("/api/notes/related", post(related))
        .route("/api/stats", get(stats))
        .route("/api/config", get(get_config))
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

async fn start_app(app: AppLocal, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("couldnt bind {addr}"))?;
    log::info!("listening on {addr}");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: AppLocal, addr: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app, addr))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            AppError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            AppError::EmptyContent => axum::http::StatusCode::BAD_REQUEST,
            AppError::Embedding(_) => {
                log::warn!("{self:?}");
                axum::http::StatusCode::BAD_GATEWAY
            }
            AppError::IO(_) | AppError::Json(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

// Lets handlers use `?` on anything that converts into `AppError`.
impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NoteCreateRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NoteUpdateRequest {
    pub id: Eid,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NoteIdRequest {
    pub id: Eid,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchQuery>,
) -> Result<Json<Vec<Note>>, HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(app.search(payload)?.into()))
}

async fn create(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<NoteCreateRequest>,
) -> Result<Json<Note>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(app.create(&payload.content)?.into()))
}

async fn update(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<NoteUpdateRequest>,
) -> Result<Json<Note>, HttpError> {
    log::debug!("update note {}", payload.id);
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(app.update(&payload.id, &payload.content)?.into()))
}

async fn delete(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<NoteIdRequest>,
) -> Result<(), HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(app.delete(&payload.id)?))
}

async fn show(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<NoteIdRequest>,
) -> Result<Json<NoteView>, HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(app.show(&payload.id)?.into()))
}

async fn related(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<NoteIdRequest>,
) -> Result<Json<Vec<Related>>, HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(app.related(&payload.id)?.into()))
}

async fn stats(State(state): State<Arc<SharedState>>) -> Result<Json<Stats>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(app.stats()?.into()))
}

async fn get_config(State(state): State<Arc<SharedState>>) -> Result<Json<Config>, HttpError> {
    let mut config = state.app.config().clone();
    if !config.embedding.api_key.is_empty() {
        config.embedding.api_key = "********".to_string();
    }

    Ok(config.into())
}
