//! HTTP routes mapping request bodies onto lease operations.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use lease_core::{ErrorKind, LeaseManager, SessionId};
use lease_observability::{RequestId, StructuredLogger};
use serde::Deserialize;

use crate::config::LogConfig;
use crate::envelope::{ApiError, ApiResponse};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub manager: LeaseManager,
    pub log: LogConfig,
}

/// Request body accepted by every lease endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRequest {
    #[serde(default)]
    pub page_name: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl LeaseRequest {
    /// The lease key, used exactly as sent.
    fn page_name(&self) -> Result<&str, ApiError> {
        if self.page_name.is_empty() {
            return Err(ApiError::BadRequest("pageName is required".to_string()));
        }
        Ok(&self.page_name)
    }

    fn session(&self) -> Option<SessionId> {
        self.session_id.clone().map(SessionId::from)
    }
}

type LeaseBody = Result<Json<LeaseRequest>, JsonRejection>;
type ApiResult = Result<Json<ApiResponse>, ApiError>;

fn parse(body: LeaseBody) -> Result<LeaseRequest, ApiError> {
    body.map(|Json(req)| req)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Build the router. Legacy route names are kept for existing clients.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/add-lease", post(add_lease))
        .route("/get-lease", post(get_lease))
        .route("/obtain-lease", post(obtain_lease))
        .route("/delete-lease", post(delete_lease))
        .route("/release-lease", post(release_lease))
        .route("/addSession", post(add_lease))
        .route("/get-data", post(get_lease))
        .route("/obtainSession", post(obtain_lease))
        .route("/deleteSession", post(delete_lease))
        .route("/releaseSession", post(release_lease))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), request_context))
        .with_state(state)
}

/// Assign a request ID, log the outcome and echo the ID back.
async fn request_context(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let request_id = RequestId::from_header(
        req.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let logger = StructuredLogger::new(request_id.clone())
        .with_service("lease-server")
        .with_route(req.uri().path())
        .with_min_level(state.log.level)
        .with_format(state.log.format);

    let method = req.method().to_string();

    logger.debug("request started");
    req.extensions_mut().insert(request_id.clone());
    let mut response = next.run(req).await;

    let status = response.status();
    let mut builder = if status.is_server_error() {
        logger.error_builder("request failed")
    } else if status.is_client_error() {
        logger.warn_builder("request rejected")
    } else {
        logger.info_builder("request completed")
    };
    builder = builder
        .field("method", method)
        .field_i64("status", i64::from(status.as_u16()));
    if let Some(kind) = response.extensions().get::<ErrorKind>() {
        builder = builder
            .field("kind", kind.as_str())
            .field_bool("retryable", kind.is_retryable());
    }
    builder.emit();

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn health() -> Json<ApiResponse> {
    Json(ApiResponse::ok(serde_json::json!({ "status": "ok" })))
}

/// Create a lease for a fresh session.
async fn add_lease(State(state): State<AppState>, body: LeaseBody) -> ApiResult {
    let req = parse(body)?;
    let lease = state.manager.create(req.page_name()?).await?;
    Ok(Json(ApiResponse::ok(lease)))
}

/// Read the current lease.
async fn get_lease(State(state): State<AppState>, body: LeaseBody) -> ApiResult {
    let req = parse(body)?;
    match state.manager.inspect(req.page_name()?).await? {
        Some(lease) => Ok(Json(ApiResponse::ok(lease))),
        None => Err(ApiError::NotFound),
    }
}

/// Acquire the lease, or confirm the caller already holds it.
async fn obtain_lease(State(state): State<AppState>, body: LeaseBody) -> ApiResult {
    let req = parse(body)?;
    let lease = state.manager.acquire(req.page_name()?, req.session()).await?;
    Ok(Json(ApiResponse::ok(lease)))
}

/// Strict release: reports whether the lease was deleted.
async fn delete_lease(State(state): State<AppState>, body: LeaseBody) -> ApiResult {
    let req = parse(body)?;
    let session = req.session().unwrap_or_default();
    if state.manager.release(req.page_name()?, &session).await? {
        Ok(Json(ApiResponse::ok(true)))
    } else {
        Err(ApiError::NotFound)
    }
}

/// Best-effort release: always reports success.
async fn release_lease(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: LeaseBody,
) -> ApiResult {
    let req = parse(body)?;
    let session = req.session().unwrap_or_default();
    match req.page_name() {
        Ok(page) => state.manager.release_best_effort(page, &session).await,
        Err(_) => tracing::debug!(request_id = %request_id, "release without pageName ignored"),
    }
    Ok(Json(ApiResponse::ok("OK")))
}
