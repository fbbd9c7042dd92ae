use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use vehicle_tech_records::records::{
    record_router, DocumentError, DocumentStore, NumberGenerator, RecordStore, TechRecordService,
};

pub(crate) fn with_record_routes<R, N>(service: Arc<TechRecordService<R, N>>) -> axum::Router
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    record_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/v1/documents/:name",
            axum::routing::get(document_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Streams a stored artifact back with a content type guessed from its name.
pub(crate) async fn document_endpoint(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.documents.download(&name) {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&name)
                .first_or_octet_stream()
                .to_string();
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(err @ DocumentError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "errors": [err.to_string()] })),
        )
            .into_response(),
        Err(err) => {
            warn!(document = %name, error = %err, "document download failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "errors": [err.to_string()] })),
            )
                .into_response()
        }
    }
}
