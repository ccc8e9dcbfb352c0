//! HTTP surface: health, metrics, order queries, escrow creation and the
//! secret relay callback.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use resolver_core::domain::{Hash, Order, OrderStatus, ResolverError, SecretRevealed};
use resolver_core::ports::ResolverApi;
use resolver_telemetry::{
    encode_metrics, GaugeGuard, ORDERS_IN_FLIGHT, ORDER_OPERATIONS, ORDER_OPERATION_DURATION,
    ORDER_TRANSITIONS,
};
use tracing::error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn ResolverApi>,
}

/// Build the router.
pub fn router(api: Arc<dyn ResolverApi>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/orders", get(list_orders))
        .route("/orders/:hash", get(get_order))
        .route("/orders/:hash/escrows", post(create_escrows))
        .route("/relay/secret", post(relay_secret))
        .with_state(AppState { api })
}

/// Error body `{kind, message}` with a status derived from the error kind.
pub struct ApiError(pub ResolverError);

impl From<ResolverError> for ApiError {
    fn from(e: ResolverError) -> Self {
        Self(e)
    }
}

/// HTTP status for an error.
pub fn status_for(error: &ResolverError) -> StatusCode {
    match error {
        ResolverError::Validation(_)
        | ResolverError::InvalidScriptParameters(_)
        | ResolverError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
        ResolverError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        ResolverError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ResolverError::SecretMismatch
        | ResolverError::UnsupportedChain(_)
        | ResolverError::UnsupportedOperation { .. }
        | ResolverError::InsufficientFunds { .. }
        | ResolverError::NoUtxos(_)
        | ResolverError::RevertedExecution(_)
        | ResolverError::BroadcastRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ResolverError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ResolverError::Rpc(_) | ResolverError::Signing(_) => StatusCode::BAD_GATEWAY,
        ResolverError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("[resolver] request failed: {}", self.0);
        }
        let body = Json(serde_json::json!({
            "kind": self.0.kind(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

fn parse_hash(raw: &str) -> Result<Hash, ApiError> {
    let trimmed = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(trimmed)
        .ok()
        .filter(|b| b.len() == 32)
        .ok_or_else(|| ResolverError::Validation(format!("{} is not a 32-byte hex hash", raw)))?;
    Ok(Hash::from_slice(&bytes))
}

/// Did a call move the order, as opposed to finding the work already done?
fn transitioned(before: Option<OrderStatus>, after: OrderStatus) -> bool {
    before != Some(after)
}

/// Run a state-changing call, recording operation metrics. `before` is the
/// order's status when the request arrived.
async fn tracked<F>(
    operation: &str,
    before: Option<OrderStatus>,
    call: F,
) -> Result<Json<Order>, ApiError>
where
    F: Future<Output = Result<Order, ResolverError>>,
{
    let _timer = ORDER_OPERATION_DURATION
        .with_label_values(&[operation])
        .start_timer();
    let in_flight = GaugeGuard::new(&ORDERS_IN_FLIGHT);
    let result = call.await;
    drop(in_flight);

    match result {
        Ok(order) => {
            ORDER_OPERATIONS.with_label_values(&[operation, "ok"]).inc();
            if transitioned(before, order.status) {
                ORDER_TRANSITIONS
                    .with_label_values(&[order.status.as_str()])
                    .inc();
            }
            Ok(Json(order))
        }
        Err(e) => {
            ORDER_OPERATIONS
                .with_label_values(&[operation, e.kind()])
                .inc();
            Err(e.into())
        }
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "htlc-resolver",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> Response {
    match encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.api.list_orders().await?))
}

async fn get_order(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let hash = parse_hash(&hash)?;
    Ok(Json(state.api.get_order(&hash).await?))
}

async fn create_escrows(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let hash = parse_hash(&hash)?;
    let before = status_of(&state, &hash).await;
    tracked("create_escrows", before, state.api.create_escrows(&hash)).await
}

async fn relay_secret(
    State(state): State<AppState>,
    Json(payload): Json<SecretRevealed>,
) -> Result<Json<Order>, ApiError> {
    let before = status_of(&state, &payload.order_hash).await;
    tracked("withdraw", before, state.api.withdraw_from_relay(&payload)).await
}

async fn status_of(state: &AppState, hash: &Hash) -> Option<OrderStatus> {
    state.api.get_order(hash).await.ok().map(|order| order.status)
}
