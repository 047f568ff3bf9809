//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::authn::signature::{self, SIGNATURE_HEADER};
use crate::models::deployment::{DeployResult, Outcome};
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Plain-text error response, newline terminated
fn text_error(status: StatusCode, message: &str) -> Response {
    (status, format!("{}\n", message)).into_response()
}

/// Deploy trigger handler
///
/// Serves every path that has no dedicated route.
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return text_error(StatusCode::METHOD_NOT_ALLOWED, "POST Expected");
    }

    if let Some(secret) = &state.secret {
        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());

        if !signature::verify(secret, &body, provided) {
            warn!(
                "Incorrect signature; got {:?}",
                provided.unwrap_or("<missing>")
            );
            return text_error(StatusCode::UNAUTHORIZED, "Incorrect Secret");
        }
    }

    info!("Deploy triggered");
    match state.coordinator.try_trigger().await {
        Outcome::Accepted(DeployResult::Success) => StatusCode::OK.into_response(),
        Outcome::Accepted(DeployResult::Failure { detail }) => {
            error!("Deploy error: {}", detail);
            text_error(StatusCode::INTERNAL_SERVER_ERROR, &detail)
        }
        Outcome::Rejected => {
            info!("Deploy already in progress, rejecting request");
            text_error(StatusCode::CONFLICT, "Deploy in Progress")
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub deploying: bool,
}

/// Health check handler
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: version_info().version,
        deploying: state.coordinator.is_busy(),
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}
