//! HTTP Server for the csvedit API.
//!
//! Provides REST endpoints to upload a CSV, edit it through commands, preview
//! it with filters and download the result and its audit log.
//!
//! # API Endpoints
//!
//! | Method | Path                                          | Description                    |
//! |--------|-----------------------------------------------|--------------------------------|
//! | GET    | `/health`                                     | Health check                   |
//! | POST   | `/api/sessions`                               | Upload CSV, open a session     |
//! | GET    | `/api/sessions/{id}`                          | Session snapshot               |
//! | POST   | `/api/sessions/{id}/preview`                  | Filtered preview               |
//! | POST   | `/api/sessions/{id}/commands`                 | Apply one edit command         |
//! | GET    | `/api/sessions/{id}/columns/{column}/values`  | Distinct values of a column    |
//! | GET    | `/api/sessions/{id}/export`                   | Download edited CSV            |
//! | GET    | `/api/sessions/{id}/log`                      | Download audit log             |
//! | DELETE | `/api/sessions/{id}`                          | Close a session                |
//! | GET    | `/api/logs`                                   | SSE stream for real-time logs  |

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, log_warning, LOG_BROADCASTER};
use super::store::{SessionStore, StoreOptions};
use super::types::{error_response, status_for, CommandResponse, PreviewRequest, SessionView};
use crate::edit::{Command, Session, SessionOptions};
use crate::error::ServerError;
use crate::view::project;

type ApiError = (StatusCode, Json<Value>);
type AppState = Arc<SessionStore>;

fn api_error(error: ServerError) -> ApiError {
    (status_for(&error), Json(error_response(&error.to_string())))
}

/// Build the application router over a session store.
pub fn router(store: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(close_session))
        .route("/api/sessions/{id}/preview", post(preview))
        .route("/api/sessions/{id}/commands", post(apply_command))
        .route(
            "/api/sessions/{id}/columns/{column}/values",
            get(column_values),
        )
        .route("/api/sessions/{id}/export", get(export_csv))
        .route("/api/sessions/{id}/log", get(export_log))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(store)
}

/// Start the HTTP server
pub async fn start_server(port: u16, options: SessionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SessionStore::with_limits(options, StoreOptions::from_env()));
    spawn_sweeper(store.clone());
    let app = router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 csvedit server running on http://localhost:{}", port);
    println!("   POST /api/sessions               - Upload CSV file");
    println!("   POST /api/sessions/{{id}}/commands - Apply an edit");
    println!("   GET  /api/sessions/{{id}}/export   - Download edited CSV");
    println!("   GET  /api/logs                   - SSE log stream");
    println!("   GET  /health                     - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically close sessions that have been idle too long.
fn spawn_sweeper(store: AppState) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let closed = store.evict_idle().await;
            if closed > 0 {
                log_info(format!("Closed {} idle session(s)", closed));
            }
        }
    });
}

/// Health check endpoint
async fn health(State(store): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "csvedit",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": store.len().await,
        "endpoints": {
            "upload": "POST /api/sessions",
            "commands": "POST /api/sessions/{id}/commands",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
async fn create_session(
    State(store): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        api_error(ServerError::BadRequest(format!("Multipart error: {}", e)))
    })? {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| api_error(ServerError::BadRequest(format!("Read error: {}", e))))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data
        .ok_or_else(|| api_error(ServerError::BadRequest("No file provided".to_string())))?;
    let name = file_name.unwrap_or_else(|| "upload.csv".to_string());

    log_info(format!("📄 Upload: {} ({} bytes)", name, bytes.len()));
    let session = Session::open(name.clone(), &bytes).map_err(|e| {
        log_error(format!("Upload {} rejected: {}", name, e));
        api_error(e.into())
    })?;

    let id = store.insert(session).await;
    log_success(format!("Opened session {} for {}", id, name));
    let handle = store.get(&id).await.map_err(api_error)?;
    let session = handle.lock().await;

    Ok((StatusCode::CREATED, Json(SessionView::unfiltered(&id, &session))))
}

async fn get_session(
    State(store): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = store.get(&id).await.map_err(api_error)?;
    let session = handle.lock().await;
    Ok(Json(SessionView::unfiltered(&id, &session)))
}

async fn close_session(
    State(store): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    store.remove(&id).await.map_err(api_error)?;
    log_info(format!("Closed session {}", id));
    Ok(StatusCode::NO_CONTENT)
}

async fn preview(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = store.get(&id).await.map_err(api_error)?;
    let session = handle.lock().await;

    let cap = req.limit.unwrap_or(session.options().preview_rows);
    let preview = project(session.dataset(), &req.filters, req.columns.as_deref(), cap);

    Ok(Json(SessionView::new(&id, &session, preview)))
}

/// Apply one command. The body is parsed here rather than by the `Json`
/// extractor so that malformed commands get the API's error shape.
async fn apply_command(
    State(store): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<CommandResponse>, ApiError> {
    let command: Command = serde_json::from_str(&body).map_err(|e| {
        log_warning(format!("Invalid command for session {}: {}", id, e));
        api_error(ServerError::BadRequest(format!("Invalid command: {}", e)))
    })?;

    let handle = store.get(&id).await.map_err(api_error)?;
    let mut session = handle.lock().await;
    let entry = session.apply(command).map_err(|e| api_error(e.into()))?;

    Ok(Json(CommandResponse {
        entry,
        session: SessionView::unfiltered(&id, &session),
    }))
}

async fn column_values(
    State(store): State<AppState>,
    Path((id, column)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let handle = store.get(&id).await.map_err(api_error)?;
    let session = handle.lock().await;

    if !session.dataset().has_column(&column) {
        return Err(api_error(ServerError::BadRequest(format!(
            "Unknown column: {}",
            column
        ))));
    }

    Ok(Json(json!({
        "column": column,
        "values": session.filter_options(&column),
    })))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    /// Comma-separated column list
    columns: Option<String>,
}

async fn export_csv(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = store.get(&id).await.map_err(api_error)?;
    let session = handle.lock().await;

    let columns: Option<Vec<String>> = query.columns.as_deref().map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    });
    let body = session.export_csv(columns.as_deref());

    Ok(attachment("text/csv; charset=utf-8", &session.export_csv_name(), body))
}

async fn export_log(
    State(store): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = store.get(&id).await.map_err(api_error)?;
    let session = handle.lock().await;

    Ok(attachment(
        "text/plain; charset=utf-8",
        &session.export_log_name(),
        session.export_log(),
    ))
}

fn attachment(content_type: &str, filename: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        ],
        body,
    )
}
