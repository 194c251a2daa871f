use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use egp_protocol::objects::{ContentId, ObjectKind, ObjectUri};
use egp_protocol::validate::{AdoptInput, ProposeInput, SenseInput, ValidationError};
use egp_protocol::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::lifecycle::LifecycleEngine;
use crate::receipt::ResolvedObject;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineServiceConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for EngineServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Clone)]
struct EngineApiState {
    engine: Arc<LifecycleEngine>,
    request_timeout: Duration,
}

impl EngineApiState {
    fn cancellation(&self) -> Cancellation {
        Cancellation::with_timeout(self.request_timeout)
    }
}

/// Builder for the HTTP surface of a governance node.
pub struct EngineApiBuilder {
    engine: Arc<LifecycleEngine>,
    request_timeout: Duration,
}

impl EngineApiBuilder {
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self {
            engine,
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
        }
    }

    /// Deadline after which an in-flight request is abandoned with `408`.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn router(&self) -> Router {
        let state = EngineApiState {
            engine: self.engine.clone(),
            request_timeout: self.request_timeout,
        };

        Router::new()
            .route("/", get(describe))
            .route("/health", get(health))
            .route("/sense", post(create_sense))
            .route("/sense/:id", get(get_sense))
            .route("/propose", post(create_proposal))
            .route("/propose/:id", get(get_proposal))
            .route("/adopt", post(create_adoption))
            .route("/adopt/:id", get(get_adoption))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    pub async fn serve(self, config: EngineServiceConfig) -> anyhow::Result<oneshot::Sender<()>> {
        let router = self
            .request_timeout(Duration::from_secs(config.request_timeout_secs))
            .router();
        let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            info!(address = %config.bind_address, "starting governance node");
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
            {
                warn!(?err, "governance node stopped with error");
            }
        });

        Ok(tx)
    }
}

async fn describe() -> impl IntoResponse {
    Json(json!({
        "protocol": "Emergent Governance Protocol",
        "version": PROTOCOL_VERSION,
        "endpoints": {
            "sense": "POST /sense",
            "propose": "POST /propose",
            "adopt": "POST /adopt",
            "resolve": "GET /{sense|propose|adopt}/{id}",
        },
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": PROTOCOL_VERSION }))
}

async fn create_sense(
    State(state): State<EngineApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let input = SenseInput::from_value(&json_body(body)?)?;
    let receipt = state.engine.sense(input, &state.cancellation()).await?;
    Ok(created(receipt.location(), &receipt))
}

async fn create_proposal(
    State(state): State<EngineApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let input = ProposeInput::from_value(&json_body(body)?)?;
    let receipt = state.engine.propose(input, &state.cancellation()).await?;
    Ok(created(receipt.location(), &receipt))
}

async fn create_adoption(
    State(state): State<EngineApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let input = AdoptInput::from_value(&json_body(body)?)?;
    let receipt = state.engine.adopt(input, &state.cancellation()).await?;
    Ok(created(receipt.location(), &receipt))
}

async fn get_sense(
    State(state): State<EngineApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    resolve(&state, ObjectKind::Sense, id).await
}

async fn get_proposal(
    State(state): State<EngineApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    resolve(&state, ObjectKind::Propose, id).await
}

async fn get_adoption(
    State(state): State<EngineApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    resolve(&state, ObjectKind::Adopt, id).await
}

async fn resolve(
    state: &EngineApiState,
    kind: ObjectKind,
    id: String,
) -> Result<Json<Value>, ApiError> {
    let id = ContentId::parse(id)
        .map_err(|err| EngineError::from(ValidationError::single("id", err.to_string())))?;
    let uri = ObjectUri::new(kind, id);
    let resolved = state.engine.resolve(&uri, &state.cancellation()).await?;
    Ok(Json(render(resolved)?))
}

fn render(resolved: ResolvedObject) -> Result<Value, ApiError> {
    let object = resolved
        .object
        .to_value()
        .map_err(|err| EngineError::Internal(err.to_string()))?;
    Ok(json!({
        "uri": resolved.uri,
        "expired": resolved.expired,
        "object": object,
    }))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(EngineError::from(ValidationError::single(
            "body",
            rejection.body_text(),
        ))
        .into()),
    }
}

fn created<T: Serialize>(location: String, receipt: &T) -> Response {
    let mut response = (StatusCode::CREATED, Json(receipt)).into_response();
    insert_location(&mut response, &location);
    response
}

fn insert_location(response: &mut Response, location: &str) {
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
}

/// HTTP rendering of an [`EngineError`].
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(EngineError::Validation(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        match self.0 {
            EngineError::Validation(err) => error_body(
                StatusCode::BAD_REQUEST,
                "validation_failed",
                err.headline().to_string(),
                Some(json!(err.issues)),
            ),
            EngineError::InvalidDuration { field, .. } => error_body(
                StatusCode::BAD_REQUEST,
                "invalid_duration",
                message,
                Some(json!({ "field": field })),
            ),
            EngineError::ReferenceNotFound { uri, .. } => error_body(
                StatusCode::NOT_FOUND,
                "reference_not_found",
                message,
                Some(json!({ "uri": uri })),
            ),
            EngineError::ReferenceExpired { uri, expired_at } => error_body(
                StatusCode::GONE,
                "reference_expired",
                message,
                Some(json!({ "uri": uri, "expired_at": expired_at })),
            ),
            EngineError::StorageUnavailable {
                retry_after_secs, ..
            } => {
                let mut response = error_body(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage_unavailable",
                    message,
                    None,
                );
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            EngineError::PartialLinkFailure {
                id,
                kind,
                linked,
                failed,
                reason,
            } => {
                let location = ObjectUri::new(kind, id.clone()).to_string();
                let mut response = error_body(
                    StatusCode::MULTI_STATUS,
                    "partial_link_failure",
                    message,
                    Some(json!({
                        "id": id,
                        "linked": linked,
                        "failed": failed,
                        "reason": reason,
                    })),
                );
                insert_location(&mut response, &location);
                response
            }
            EngineError::Cancelled => error_body(
                StatusCode::REQUEST_TIMEOUT,
                "cancelled",
                message,
                None,
            ),
            EngineError::Internal(_) => {
                warn!(error = %message, "request failed");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    message,
                    None,
                )
            }
        }
    }
}

fn error_body(
    status: StatusCode,
    error: &'static str,
    message: String,
    details: Option<Value>,
) -> Response {
    let mut body = json!({ "error": error, "message": message });
    if let Some(details) = details {
        body["details"] = details;
    }
    (status, Json(body)).into_response()
}
