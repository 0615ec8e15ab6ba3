//! Browser UI: upload a plan, get the cost report back as a page.
//!
//! | Route | |
//! |-------|---|
//! | `GET /` | upload form |
//! | `POST /estimate` | multipart field `plan` (a PDF) → HTML report |
//! | `GET /health` | `{"status":"ok","version":…}` |
//!
//! Each upload is an independent request; the [`Estimator`] is shared but
//! holds no per-request state.

use crate::error::EstimateError;
use crate::estimate::Estimator;
use crate::output::PlanDocument;
use crate::report::{render_error_html, render_upload_form};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Multipart field that carries the PDF.
pub const UPLOAD_FIELD: &str = "plan";

/// Default cap on upload size.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<Estimator>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(estimator: Estimator) -> Arc<Self> {
        Arc::new(Self {
            estimator: Arc::new(estimator),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    pub fn with_max_upload_bytes(estimator: Estimator, max_upload_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            estimator: Arc::new(estimator),
            max_upload_bytes,
        })
    }
}

/// Build the router with tracing and body-size middleware.
pub fn create_app(state: Arc<AppState>) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/estimate", post(estimate_upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(trace_layer)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("plancost serve listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("plancost serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// A failed request, rendered as an HTML error page.
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }
}

impl From<EstimateError> for AppError {
    fn from(e: EstimateError) -> Self {
        let status = match &e {
            e if e.is_stage_failure() => StatusCode::UNPROCESSABLE_ENTITY,
            EstimateError::NotAPdf { .. } | EstimateError::InvalidQuantities(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Html(render_error_html(&self.message))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index() -> Html<String> {
    Html(render_upload_form())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn estimate_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let document = read_upload(&mut multipart).await?;
    info!("Upload '{}' ({} bytes)", document.name, document.bytes.len());

    let report = state.estimator.estimate(document).await?;
    Ok(Html(state.estimator.present_html(&report)))
}

/// Pull the `plan` field out of the form; other fields are ignored.
async fn read_upload(multipart: &mut Multipart) -> Result<PlanDocument, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| AppError {
        status: e.status(),
        message: e.body_text(),
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or("upload.pdf")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| AppError {
            status: e.status(),
            message: e.body_text(),
        })?;
        if bytes.is_empty() {
            return Err(AppError::bad_request("The uploaded file is empty"));
        }
        return Ok(PlanDocument::new(name, bytes.to_vec()));
    }
    Err(AppError::bad_request(format!(
        "No file uploaded: expected a multipart field named '{UPLOAD_FIELD}'"
    )))
}
