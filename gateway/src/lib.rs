//! HTTP surface of the generate relay.
//!
//! `POST /api/generate` reads the submission once, normalizes it, and either
//! echoes the result (`?echo=1`) or relays it to the webhook.

pub mod api;
pub mod error;

use axum::{
    body::to_bytes,
    extract::{RawQuery, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{EchoResponse, GenerateQuery, RouteHealth, GENERATE_ROUTE};
use crate::error::GatewayError;
use relay_core::{ForwardError, Forwarder, NormalizePolicy, Payload, RelayConfig};

// Everything a request needs; nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Option<Arc<Forwarder>>,
    pub policy: NormalizePolicy,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &RelayConfig) -> Result<Self, ForwardError> {
        let forwarder = match config.forwarder_config() {
            Some(forwarder_config) => Some(Arc::new(Forwarder::new(forwarder_config)?)),
            None => None,
        };
        Ok(Self {
            forwarder,
            policy: config.policy,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

// Browsers call the relay directly, so every response carries the same
// static CORS headers, errors and preflights included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(GENERATE_ROUTE, get(route_health).post(generate).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS, GET"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- HANDLERS ---

async fn health_check() -> &'static str {
    "Generate Relay: Operational"
}

async fn route_health() -> Json<RouteHealth> {
    Json(RouteHealth {
        ok: true,
        route: GENERATE_ROUTE,
    })
}

async fn preflight() -> Json<Value> {
    Json(json!({}))
}

async fn generate(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    request: Request,
) -> Result<Response, GatewayError> {
    // STEP 1: Refuse early if there is nowhere to forward to
    let Some(forwarder) = state.forwarder.clone() else {
        warn!("POST rejected: webhook URL is not configured");
        return Err(GatewayError::NotConfigured);
    };

    // STEP 2: Read the body exactly once; the request is consumed here
    let bytes = to_bytes(request.into_body(), state.max_body_bytes)
        .await
        .map_err(GatewayError::BodyRead)?;
    let body = String::from_utf8_lossy(&bytes).into_owned();

    // STEP 3: Normalize (non-JSON bodies pass through as text)
    let payload = Payload::from_body(body, &state.policy);

    // STEP 4: Echo mode short-circuits before any downstream call
    if GenerateQuery::from_raw(raw_query.as_deref()).is_echo() {
        info!("Echo mode: returning normalized payload");
        return Ok(Json(EchoResponse { ok: true, payload }).into_response());
    }

    // STEP 5: Forward with retries
    let outbound = payload.into_body()?;
    info!("Forwarding {} bytes to webhook", outbound.len());
    let outcome = forwarder.forward(outbound).await?;

    // STEP 6: Relay the webhook's answer
    let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::OK);
    Ok((status, Json(outcome.body)).into_response())
}
