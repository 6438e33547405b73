use std::sync::Arc;

use axum::{
    Router,
    extract::MatchedPath,
    http::{HeaderName, Method, Request, header},
};
use slotd_common::views::ApiErrorResponse;
use slotd_db::storage::Ledger;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::{
    ToSchema,
    openapi::{Contact, Info, License, OpenApi, RefOr, path::Operation},
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{config::SlotdConfig, context::ApiContext, handlers};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the router and its OpenAPI description on top of `ledger`.
pub fn make(cfg: SlotdConfig, ledger: Arc<dyn Ledger>) -> (Router, OpenApi) {
    let cors = match &cfg.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
        None => CorsLayer::permissive(),
    };

    let context = ApiContext::new(cfg, ledger);

    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            MakeRequestUuid,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        method = req.method().to_string(),
                        request_id = Option::<&str>::None,
                        path = Option::<&str>::None,
                    );

                    if let Some(request_id) = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                    {
                        span.record("request_id", request_id);
                    };

                    if let Some(path) = req.extensions().get::<MatchedPath>() {
                        span.record("path", path.as_str())
                    } else {
                        span.record("path", req.uri().path())
                    };

                    span
                }),
        )
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(x_request_id));

    let openapi = OpenApi::builder()
        .info(
            Info::builder()
                .title("slotd API Reference")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some(
                    "License-gated device registry and scrape discovery feed.",
                ))
                .license(Some(
                    License::builder()
                        .name("Apache 2.0 License")
                        .identifier(Some(env!("CARGO_PKG_LICENSE")))
                        .build(),
                ))
                .contact(Some(
                    Contact::builder()
                        .name(Some("slotd maintainers"))
                        .build(),
                )),
        )
        .build();

    let (r, mut a) = OpenApiRouter::with_openapi(openapi)
        .routes(routes!(handlers::health::health))
        .routes(routes!(handlers::health::healthz))
        .routes(routes!(handlers::health::version))
        .routes(routes!(handlers::license::license_status))
        .routes(routes!(handlers::license::activate_device))
        .routes(routes!(handlers::license::activate_batch))
        .routes(routes!(handlers::license::deactivate_device))
        .routes(routes!(handlers::devices::create_device))
        .routes(routes!(handlers::devices::list_active_devices))
        .routes(routes!(handlers::devices::get_device))
        .routes(routes!(handlers::discovery::sd_targets))
        .layer(middleware)
        .with_state(context)
        .split_for_parts();

    a.paths.paths.iter_mut().for_each(|(_path, item)| {
        apply_default_errors(&mut item.get);
        apply_default_errors(&mut item.post);
    });

    (r, a)
}

fn apply_default_errors(item: &mut Option<Operation>) {
    if let Some(item) = item {
        item.responses.responses.insert(
            "500".into(),
            RefOr::Ref(
                utoipa::openapi::Ref::builder()
                    .summary("Internal server error")
                    .ref_location_from_schema_name(ApiErrorResponse::name())
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use slotd_common::Labels;
    use slotd_db::{
        models::{Activation, LicenseUsage, NewLicense},
        storage::{
            LicenseStore, StoreError,
            memory::MemoryLedger,
            sqlite::{SqliteLedger, SqliteOptions},
        },
    };
    use tower::ServiceExt;

    use super::*;

    async fn app(max_agents: i32) -> (Arc<MemoryLedger>, Router) {
        let ledger = Arc::new(MemoryLedger::new(50));
        ledger
            .create_license(NewLicense::active("install", max_agents))
            .await
            .unwrap();
        let (router, _) = make(SlotdConfig::defaults(), ledger.clone());
        (ledger, router)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        };
        router.clone().oneshot(request.unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn activate_then_list_and_discover() {
        let (_, router) = app(5).await;

        let response = send(
            &router,
            "POST",
            "/license/activate",
            Some(json!({ "agentKey": "a1", "ipAddress": "10.0.0.1", "port": 9100 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["device"]["id"], "device-a1");
        assert_eq!(body["device"]["port"], 9100);
        assert_eq!(body["device"]["status"], "active");

        let devices = json_body(send(&router, "GET", "/api/devices/active", None).await).await;
        assert_eq!(devices.as_array().unwrap().len(), 1);
        assert_eq!(devices[0]["agentKey"], "a1");

        let feed = json_body(send(&router, "GET", "/sd/targets", None).await).await;
        assert_eq!(
            feed,
            json!([{
                "targets": ["10.0.0.1:9100"],
                "labels": {
                    "job": "windows-agents",
                    "__meta_device_id": "device-a1",
                    "__meta_agent_key": "a1",
                },
            }])
        );
    }

    #[tokio::test]
    async fn limit_is_forbidden() {
        let (_, router) = app(1).await;
        let activate = |key: &str| json!({ "agentKey": key, "ipAddress": "10.0.0.1" });

        let ok = send(&router, "POST", "/license/activate", Some(activate("a1"))).await;
        assert_eq!(ok.status(), StatusCode::OK);

        let rejected = send(&router, "POST", "/license/activate", Some(activate("a2"))).await;
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(rejected).await["code"], "LimitExceeded");

        // Refreshing the known agent still works at the ceiling.
        let refresh = send(&router, "POST", "/license/activate", Some(activate("a1"))).await;
        assert_eq!(refresh.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_or_incomplete_requests_are_bad_requests() {
        let (_, router) = app(5).await;

        let request = Request::builder()
            .method("POST")
            .uri("/license/activate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let missing = send(
            &router,
            "POST",
            "/license/activate",
            Some(json!({ "agentKey": "", "ipAddress": "10.0.0.1" })),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(missing).await["code"], "InvalidRequest");

        let empty_batch = send(
            &router,
            "POST",
            "/license/activate-batch",
            Some(json!({ "devices": [] })),
        )
        .await;
        assert_eq!(empty_batch.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_over_capacity_conflicts() {
        let (ledger, router) = app(2).await;

        let response = send(
            &router,
            "POST",
            "/license/activate-batch",
            Some(json!({ "devices": [
                { "agentKey": "a1", "ipAddress": "10.0.0.1" },
                { "agentKey": "a2", "ipAddress": "10.0.0.2" },
                { "agentKey": "a3", "ipAddress": "10.0.0.3" },
            ]})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_body(response).await,
            json!({
                "ok": false,
                "reason": "limit_reached",
                "message": "Adding these devices would exceed license limit",
                "current_active": 0,
                "max_devices": 2,
                "requested": 3,
            })
        );
        assert!(ledger.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_within_capacity_reports_results() {
        let (_, router) = app(5).await;

        let response = send(
            &router,
            "POST",
            "/license/activate-batch",
            Some(json!({ "devices": [
                { "deviceId": "dev-1", "agentKey": "a1", "ipAddress": "10.0.0.1" },
                { "agentKey": "a2", "ipAddress": "" },
            ]})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["success_count"], 1);
        assert_eq!(body["total_count"], 2);
        assert_eq!(body["results"][0]["deviceId"], "dev-1");
        assert_eq!(body["results"][0]["device"]["port"], 9182);
        assert_eq!(body["results"][1]["success"], false);
        assert!(body["results"][1].get("device").is_none());
    }

    #[tokio::test]
    async fn deactivate_round_trip() {
        let (_, router) = app(5).await;
        send(
            &router,
            "POST",
            "/api/devices",
            Some(json!({ "agent_key": "a1", "ip": "10.0.0.1", "port": 9100 })),
        )
        .await;

        let found = send(&router, "GET", "/api/devices/device-a1", None).await;
        assert_eq!(found.status(), StatusCode::OK);

        let response = send(
            &router,
            "POST",
            "/license/deactivate",
            Some(json!({ "deviceId": "device-a1" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "success": true,
                "message": "Device deactivated successfully",
                "device": "device-a1",
            })
        );

        let again = send(
            &router,
            "POST",
            "/license/deactivate",
            Some(json!({ "deviceId": "device-a1" })),
        )
        .await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);

        let status = json_body(send(&router, "GET", "/license/status", None).await).await;
        assert_eq!(status["used_slots"], 0);
        assert_eq!(status["max_slots"], 5);
        assert_eq!(status["remaining_slots"], 5);
        assert_eq!(status["is_online"], true);
    }

    #[tokio::test]
    async fn create_device_returns_created() {
        let (_, router) = app(5).await;
        let response = send(
            &router,
            "POST",
            "/api/devices",
            Some(json!({ "agent_key": "a1", "ip": "10.0.0.1" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["id"], "device-a1");
        assert_eq!(body["port"], 9182);
    }

    #[tokio::test]
    async fn health_endpoints() {
        let (_, router) = app(5).await;

        let health = send(&router, "GET", "/health", None).await;
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(json_body(health).await["status"], "ok");

        let healthz = send(&router, "GET", "/healthz", None).await;
        let bytes = to_bytes(healthz.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");

        let version = json_body(send(&router, "GET", "/version", None).await).await;
        assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
    }

    struct Unavailable;

    #[async_trait]
    impl Ledger for Unavailable {
        async fn admit(&self, _: &str, _: &str, _: &Labels) -> Result<Activation, StoreError> {
            Err(StoreError::Internal("disk on fire".into()))
        }

        async fn remove(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Internal("disk on fire".into()))
        }

        async fn list_all(&self) -> Result<Vec<Activation>, StoreError> {
            Err(StoreError::Internal("disk on fire".into()))
        }

        async fn status(&self) -> Result<LicenseUsage, StoreError> {
            Err(StoreError::Internal("disk on fire".into()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Internal("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn storage_failures_are_internal_errors() {
        let (router, _) = make(SlotdConfig::defaults(), Arc::new(Unavailable));

        for (method, uri, body) in [
            ("GET", "/health", None),
            ("GET", "/license/status", None),
            ("GET", "/sd/targets", None),
            (
                "POST",
                "/license/activate",
                Some(json!({ "agentKey": "a1", "ipAddress": "10.0.0.1" })),
            ),
            (
                "POST",
                "/license/deactivate",
                Some(json!({ "deviceId": "device-a1" })),
            ),
        ] {
            let response = send(&router, method, uri, body).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(json_body(response).await["code"], "InternalError");
        }
    }

    #[tokio::test]
    async fn sqlite_backed_router() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slotd.db");
        let ledger = SqliteLedger::open(
            path.to_str().unwrap(),
            SqliteOptions {
                fallback_max_agents: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let (router, _) = make(SlotdConfig::defaults(), Arc::new(ledger));

        let first = send(
            &router,
            "POST",
            "/license/activate",
            Some(json!({ "agentKey": "a1", "ipAddress": "10.0.0.1" })),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = send(
            &router,
            "POST",
            "/license/activate",
            Some(json!({ "agentKey": "a2", "ipAddress": "10.0.0.2" })),
        )
        .await;
        assert_eq!(second.status(), StatusCode::FORBIDDEN);

        let status = json_body(send(&router, "GET", "/license/status", None).await).await;
        assert_eq!(status["used_slots"], 1);
        assert_eq!(status["max_slots"], 0);
        assert_eq!(status["status"], "inactive");
    }

    #[test]
    fn openapi_lists_every_route() {
        let (_, api) = make(SlotdConfig::defaults(), Arc::new(MemoryLedger::new(50)));

        for path in [
            "/health",
            "/healthz",
            "/version",
            "/license/status",
            "/license/activate",
            "/license/activate-batch",
            "/license/deactivate",
            "/api/devices",
            "/api/devices/active",
            "/api/devices/{id}",
            "/sd/targets",
        ] {
            assert!(api.paths.paths.contains_key(path), "{path}");
        }

        let activate = api.paths.paths["/license/activate"].post.as_ref().unwrap();
        assert!(activate.responses.responses.contains_key("403"));
        assert!(activate.responses.responses.contains_key("500"));
    }
}
