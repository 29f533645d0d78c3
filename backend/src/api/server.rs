//! HTTP server for sheethook.
//!
//! The spreadsheet's edit trigger forwards events here.
//!
//! # API Endpoints
//!
//! | Method | Path                  | Description                              |
//! |--------|-----------------------|------------------------------------------|
//! | GET    | `/health`             | Health check                             |
//! | POST   | `/api/edit`           | Handle a forwarded edit event            |
//! | POST   | `/api/context`        | Build a context tree from a JSON grid    |
//! | POST   | `/api/context/upload` | Build a context tree from an uploaded CSV|
//! | GET    | `/api/logs`           | SSE stream for real-time logs            |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, ContextResponse, EditResponse};
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::EditEvent;
use crate::parser::{grid_from_value, parse_bytes_auto};
use crate::transform::{context_from_grid, EditHandler};

type ApiError = (StatusCode, Json<Value>);

/// Start the HTTP server
pub async fn start_server(port: u16, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(EditHandler::new(config)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("sheethook listening on http://localhost:{}", port);
    println!("   POST /api/edit            - Forwarded edit events");
    println!("   POST /api/context         - Grid JSON -> context tree");
    println!("   POST /api/context/upload  - CSV upload -> context tree");
    println!("   GET  /api/logs            - SSE log stream");
    println!("   GET  /health              - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router around a shared edit handler
pub fn router(handler: Arc<EditHandler>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/edit", post(handle_edit))
        .route("/api/context", post(build_context))
        .route("/api/context/upload", post(upload_context))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(handler)
}

async fn health(State(handler): State<Arc<EditHandler>>) -> Json<Value> {
    let config = handler.config();
    Json(json!({
        "status": "ok",
        "service": "sheethook",
        "version": env!("CARGO_PKG_VERSION"),
        "sheets": {
            "context": config.context_sheet,
            "epics": config.epics_sheet
        },
        "cacheTtlSecs": config.cache_ttl_secs
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Forwarded edit event
async fn handle_edit(
    State(handler): State<Arc<EditHandler>>,
    Json(event): Json<EditEvent>,
) -> Result<Json<EditResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    log_info(format!(
        "[{}] edit {}!R{}C{}",
        request_id, event.sheet_name, event.row, event.column
    ));

    let outcome = handler.handle(&event).await.map_err(|e| {
        log_error(format!("[{}] {}", request_id, e));
        (status_for(&e), Json(error_response(&e.to_string())))
    })?;

    Ok(Json(EditResponse::new(request_id, outcome)))
}

/// Grid posted as a JSON array of rows
async fn build_context(Json(body): Json<Value>) -> Result<Json<ContextResponse>, ApiError> {
    let grid = grid_from_value(body)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(error_response(&e.to_string()))))?;

    let context = context_from_grid(&grid);
    Ok(Json(ContextResponse::from_rows(grid.len(), context)))
}

/// Multipart upload with a `file` field holding a CSV or JSON export
async fn upload_context(mut multipart: Multipart) -> Result<Json<ContextResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, Json(error_response(&format!("Multipart error: {}", e))))
    })? {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| {
                        (StatusCode::BAD_REQUEST, Json(error_response(&format!("Read error: {}", e))))
                    })?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data
        .ok_or_else(|| (StatusCode::BAD_REQUEST, Json(error_response("No file provided"))))?;

    log_info(format!(
        "Context upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let parsed = parse_bytes_auto(&bytes)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(error_response(&e.to_string()))))?;

    let context = context_from_grid(&parsed.grid);
    Ok(Json(ContextResponse::from_parsed(&parsed, context)))
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::MissingGrid(_) | PipelineError::MissingRow(_) => StatusCode::BAD_REQUEST,
        PipelineError::Context(_) | PipelineError::Row(_) | PipelineError::Payload(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::Webhook(_) => StatusCode::BAD_GATEWAY,
        PipelineError::MissingWebhook(_) | PipelineError::Cache(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_app() -> String {
        let app = router(Arc::new(EditHandler::new(Config::default())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_app().await;
        let body: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sheets"]["context"], "Context");
        assert_eq!(body["cacheTtlSecs"], 21_600);
    }

    #[tokio::test]
    async fn test_context_endpoint() {
        let base = spawn_app().await;
        let grid = json!([
            ["Collection", "", "", "Key", "", "", "Value"],
            ["Collection1", "", "", "Key1", "", "", "Value1"],
            ["", "", "", "Key2", "", "", "true"]
        ]);

        let response = reqwest::Client::new()
            .post(format!("{}/api/context", base))
            .json(&grid)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["context"], json!({"Collection1": {"Key1": "Value1"}, "Key2": true}));
        assert_eq!(body["metadata"]["rowCount"], 3);
        assert_eq!(body["metadata"]["entries"], 2);
    }

    #[tokio::test]
    async fn test_context_endpoint_rejects_non_grid() {
        let base = spawn_app().await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/context", base))
            .json(&json!({"not": "a grid"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_edit_endpoint() {
        let base = spawn_app().await;
        let event = json!({
            "spreadsheetId": "sheet-9",
            "sheetName": "Context",
            "row": 2,
            "column": 7,
            "value": "12",
            "grid": [
                ["Collection", "", "", "Key", "", "", "Value"],
                ["", "", "", "sprint", "", "", "12"]
            ]
        });

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/edit", base))
            .json(&event)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "ok");
        assert_eq!(body["result"]["outcome"], "contextRefreshed");
        assert_eq!(body["result"]["cacheKey"], "contextData_sheet-9_2");
    }

    #[tokio::test]
    async fn test_edit_endpoint_missing_grid() {
        let base = spawn_app().await;
        let event = json!({
            "spreadsheetId": "sheet-9",
            "sheetName": "Context",
            "row": 2,
            "column": 7
        });

        let response = reqwest::Client::new()
            .post(format!("{}/api/edit", base))
            .json(&event)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "error");
    }
}
