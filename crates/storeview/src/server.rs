//! JSON HTTP API for configured views.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/views` | List configured views |
//! | `POST` | `/views/{name}` | Compute one page of a view |
//! | `POST` | `/views/{name}/summary` | Count filtered records per class |
//! | `POST` | `/views/{name}/totals` | Sum an amount over filtered records |
//!
//! Request bodies are JSON objects; `{}` means "no filters, first page".
//! Each request refetches the view's collections.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid query: since must be YYYY-MM-DD, got 'x'" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream_error` (502),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser dashboards can
//! call the API directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::sources::{FetchError, SourceProvider};
use crate::summary::{summarize, total, SummaryQuery, TotalsQuery};
use crate::views::{list_views, load_view, ViewDescriptor, ViewError, ViewQuery};

/// Shared state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    provider: Arc<SourceProvider>,
}

/// Build the router without binding, for embedding in another server.
pub fn router(config: &Config) -> anyhow::Result<Router> {
    let state = AppState {
        config: Arc::new(config.clone()),
        provider: Arc::new(SourceProvider::new(config)?),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/views", get(handle_list_views))
        .route("/views/{name}", post(handle_view))
        .route("/views/{name}/summary", post(handle_summary))
        .route("/views/{name}/totals", post(handle_totals))
        .layer(cors)
        .with_state(state))
}

/// Starts the HTTP server on `[server].bind`. Runs until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = router(config)?;
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, views = config.views.len(), "server listening");
    println!("storeview server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn view_status(err: &ViewError) -> (StatusCode, &'static str) {
    match err {
        ViewError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        ViewError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "bad_request"),
    }
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        let (status, code) = view_status(&err);
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    /// Maps typed errors found anywhere in the chain; everything else is 500.
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);

        if let Some(view_err) = err.downcast_ref::<ViewError>() {
            let (status, code) = view_status(view_err);
            return AppError {
                status,
                code,
                message,
            };
        }

        match err.downcast_ref::<FetchError>() {
            Some(FetchError::UnknownCollection(_)) | None => {
                error!(error = %message, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message,
                }
            }
            Some(_) => {
                warn!(error = %message, "upstream fetch failed");
                AppError {
                    status: StatusCode::BAD_GATEWAY,
                    code: "upstream_error",
                    message,
                }
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /views ============

#[derive(Serialize)]
struct ViewListResponse {
    views: Vec<ViewDescriptor>,
}

async fn handle_list_views(State(state): State<AppState>) -> Json<ViewListResponse> {
    Json(ViewListResponse {
        views: list_views(&state.config),
    })
}

// ============ POST /views/{name} ============

async fn handle_view(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(query): Json<ViewQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let loaded = load_view(&state.config, &state.provider, &name).await?;
    let params = loaded.params(&query)?;
    let result = loaded.compute(&params);
    let body = serde_json::to_value(&result).map_err(anyhow::Error::from)?;
    Ok(Json(body))
}

// ============ POST /views/{name}/summary ============

async fn handle_summary(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(query): Json<SummaryQuery>,
) -> Result<Json<storeview_core::summary::Summary>, AppError> {
    let loaded = load_view(&state.config, &state.provider, &name).await?;
    Ok(Json(summarize(&loaded, &query)?))
}

// ============ POST /views/{name}/totals ============

async fn handle_totals(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(query): Json<TotalsQuery>,
) -> Result<Json<storeview_core::summary::Totals>, AppError> {
    let loaded = load_view(&state.config, &state.provider, &name).await?;
    Ok(Json(total(&loaded, &query)?))
}
