//! Purpose: HTTP/JSON notes server.
//! Exports: `ServeConfig`, `serve`, `router`.
//! Role: Axum router translating `/api/notes` verbs into `NoteStore` calls.
//! Invariants: Validation failures are 400 with a plain-text reason.
//! Invariants: Store failures are 500 with a generic plain-text body; details go to the log only.
//! Invariants: Writes are committed before the response is sent.

use axum::body::Bytes;
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::json;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use notebox::api::{Error, ErrorKind, NoteDraft, NoteId, NoteStore, SqliteStore};

const SERVER_ERROR_BODY: &str = "Oops, something went wrong!";
const INVALID_ID_BODY: &str = "ID must be a valid integer";

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
}

struct AppState {
    store: Arc<dyn NoteStore>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let store = SqliteStore::open(&config.db_path)?;
    let app = router(Arc::new(store));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    let local_addr = listener.local_addr().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read bound address")
            .with_source(err)
    })?;
    tracing::info!(
        addr = %local_addr,
        db = %config.db_path.display(),
        "server is running at http://{local_addr}"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

pub fn router(store: Arc<dyn NoteStore>) -> Router {
    let state = Arc::new(AppState { store });
    Router::new()
        .route("/", get(healthz))
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/", put(missing_id).delete(missing_id))
        .route("/api/notes/:id", put(update_note).delete(delete_note))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if config.db_path.as_os_str().is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--db must not be empty")
            .with_hint("Pass a file path like notes.db."));
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn healthz() -> Response {
    Json(json!({ "message": "Ok" })).into_response()
}

async fn list_notes(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list() {
        Ok(notes) => Json(notes).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_note(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let draft = match NoteDraft::from_json_body(&body) {
        Ok(draft) => draft,
        Err(err) => return error_response(err),
    };
    match state.store.create(&draft) {
        Ok(note) => {
            tracing::debug!(id = note.id, "note created");
            Json(note).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    body: Bytes,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    let draft = match NoteDraft::from_json_body(&body) {
        Ok(draft) => draft,
        Err(err) => return error_response(err),
    };
    match state.store.update_by_id(id, &draft) {
        Ok(note) => Json(note).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    match state.store.delete_by_id(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

// `/api/notes/` with an empty id segment never reaches the `:id` route.
async fn missing_id() -> Response {
    error_response(Error::new(ErrorKind::Usage).with_message(INVALID_ID_BODY))
}

fn parse_id(raw: &str) -> Result<NoteId, Error> {
    raw.parse::<NoteId>()
        .map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(INVALID_ID_BODY)
                .with_source(err)
        })
}

// Only validation reasons reach the client; anything else is logged and flattened to a 500.
fn error_response(err: Error) -> Response {
    match err.kind() {
        ErrorKind::Usage => {
            let message = err.message().unwrap_or("bad request").to_string();
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        ErrorKind::NotFound | ErrorKind::Io | ErrorKind::Internal => {
            tracing::error!(error = %err, "note store operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY).into_response()
        }
    }
}
