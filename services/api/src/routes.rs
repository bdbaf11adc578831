use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use promotion_eval::workflows::promotion::{
    promotion_router, AccessPolicy, PersonnelStore, PromotionScoringService, ResultSink,
};
use serde_json::json;
use std::sync::Arc;

/// Promotion endpoints plus the unauthenticated probes used by the orchestrator.
pub(crate) fn with_promotion_routes<D, S>(
    service: Arc<PromotionScoringService<D, S>>,
    policy: Arc<AccessPolicy>,
) -> axum::Router
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    promotion_router(service, policy)
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
    use crate::infra::{InMemoryPersonnelStore, InMemoryResultStore};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use promotion_eval::workflows::promotion::{
        CallerRole, CandidateCategory, CandidateId, PersonnelRecord, RubricConfig,
    };
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool, policy: AccessPolicy) -> (axum::Router, InMemoryPersonnelStore) {
        let store = InMemoryPersonnelStore::default();
        let service = Arc::new(PromotionScoringService::new(
            Arc::new(store.clone()),
            Arc::new(InMemoryResultStore::default()),
            RubricConfig::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_promotion_routes(service, Arc::new(policy)).layer(Extension(state));
        (router, store)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request builds")
    }

    async fn read_json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn probes_skip_the_token_check() {
        let mut policy = AccessPolicy::default();
        policy.grant("secret", CallerRole::Reader);
        let (router, _store) = app(true, policy);

        let response = router
            .clone()
            .oneshot(get("/health"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json_body(response).await["status"], "ok");

        let response = router
            .oneshot(get("/v1/api/candidates"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn readiness_reflects_the_flag() {
        let (router, _store) = app(false, AccessPolicy::default());
        let response = router
            .oneshot(get("/ready"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json_body(response).await["status"], "initializing");

        let (router, _store) = app(true, AccessPolicy::default());
        let response = router
            .oneshot(get("/ready"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_exposed_as_prometheus_text() {
        let (router, _store) = app(true, AccessPolicy::default());
        let response = router
            .oneshot(get("/metrics"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn selection_flows_through_in_memory_stores() {
        let (router, store) = app(true, AccessPolicy::default());
        store.set_personnel(vec![PersonnelRecord {
            id: CandidateId::new("3001"),
            full_name: "Ana Rojas".to_string(),
            grade: 8,
            category: CandidateCategory::Comando,
            last_promotion: NaiveDate::from_ymd_opt(2019, 5, 1).expect("valid date"),
            required_years: 4,
        }]);

        let request = Request::post("/v1/api/selections")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"fecha": "2025-06-30", "grado": 8, "categoria": "C"}"#,
            ))
            .expect("request builds");
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::post("/v1/api/scores/military-courses")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["candidate_id"], "3001");
        assert_eq!(body["data"][0]["total_points"], 6.0);
    }
}
