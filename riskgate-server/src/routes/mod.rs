use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use riskgate_core::{ClassifyRequest, Loader, MxResolver, Registry, Verdict};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub resolver: Arc<MxResolver>,
    pub loader: Arc<Loader>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/v1/classify", post(classify))
        .route("/admin/refresh", post(refresh))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> Json<riskgate_core::Status> {
    Json(state.loader.status())
}

#[derive(Debug, Deserialize)]
pub struct ClassifyBody {
    pub email: Option<String>,
    pub ip: Option<String>,
}

async fn classify(State(state): State<AppState>, Json(body): Json<ClassifyBody>) -> AppResult<Json<Verdict>> {
    if let Some(ip) = &body.ip {
        if ip.parse::<std::net::Ipv4Addr>().is_err() {
            return Err(AppError::bad_request(format!("malformed ip: {ip}")));
        }
    }
    if let Some(email) = &body.email {
        if !is_plausible_email(email) {
            return Err(AppError::bad_request(format!("malformed email: {email}")));
        }
    }

    let request = ClassifyRequest {
        email: body.email,
        ip: body.ip,
    };
    let verdict = riskgate_core::classify(&state.registry, &state.resolver, &request).await;
    Ok(Json(verdict))
}

/// Cheap HTTP-boundary shape check: exactly one `@` with non-empty local and
/// domain parts. The classifier itself never rejects input; this only guards
/// against obviously malformed requests before they reach it.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Trigger an out-of-band refresh. Coalesces with any refresh already in
/// flight rather than starting a second one.
async fn refresh(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.loader.update_now().await?;
    Ok(Json(json!({ "status": "refreshed" })))
}
