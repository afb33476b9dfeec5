use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use complaint_desk::workflows::complaints::{
    complaint_router, CodeSender, ComplaintDesk, SubmissionStore,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes<S, D>(desk: Arc<ComplaintDesk<S, D>>) -> axum::Router
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    complaint_router(desk)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::StoreBackend;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use complaint_desk::config::StorageConfig;
    use complaint_desk::workflows::complaints::{
        AdminCredentials, AdminSession, ChangeFeed, DeskOptions, LoggingCodeSender,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn build_app(ready: bool) -> axum::Router {
        let feed = ChangeFeed::new();
        let desk = Arc::new(ComplaintDesk::new(
            Arc::new(StoreBackend::open(
                &StorageConfig { slot_path: None },
                feed.clone(),
            )),
            Arc::new(LoggingCodeSender),
            AdminSession::new(AdminCredentials::default(), feed),
            DeskOptions::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_service_routes(desk).layer(Extension(state))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get(build_app(true), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload.get("status").and_then(Value::as_str), Some("ok"));
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        let (status, _) = get(build_app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn complaint_routes_are_mounted() {
        let (status, _) = get(build_app(true), "/api/v1/complaints/REF-0001").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(build_app(true), "/api/v1/admin/complaints").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let (status, _) = get(build_app(true), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }
}
