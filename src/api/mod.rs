//! HTTP surface for the deduplicator.
//!
//! Accepts a ranked result page plus the sanitized request parameters and
//! answers with the surviving records and per-call counters.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dedupe::{DedupeStats, Deduplicator};
use crate::models::PlaceRecord;
use crate::request::RequestContext;

/// Application state shared across handlers
pub struct AppState {
    pub deduplicator: Deduplicator,
}

impl AppState {
    pub fn new(deduplicator: Deduplicator) -> Self {
        Self { deduplicator }
    }
}

/// Routes without transport layers; the server binary adds CORS and tracing
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/dedupe", post(dedupe_handler))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct DedupeRequest {
    #[serde(default)]
    pub clean: RequestContext,
    pub data: Vec<PlaceRecord>,
}

#[derive(Debug, Serialize)]
pub struct DedupeResponse {
    pub data: Vec<PlaceRecord>,
    pub stats: DedupeStats,
}

async fn dedupe_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DedupeRequest>,
) -> Json<DedupeResponse> {
    let merged = state
        .deduplicator
        .merge_with_stats(request.data, &request.clean);

    debug!(
        "POST /v1/dedupe: {} in, {} out",
        merged.stats.input, merged.stats.returned
    );

    Json(DedupeResponse {
        data: merged.records,
        stats: merged.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn app() -> Router {
        build_router(Arc::new(AppState::new(Deduplicator::default())))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn extract_json(body: Body) -> Value {
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["status"], "ok");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn test_dedupe_endpoint() {
        let request = post_json(
            "/v1/dedupe",
            json!({
                "clean": { "text": "Lancaster", "size": 10 },
                "data": [
                    {
                        "source": "geonames",
                        "source_id": "123456",
                        "layer": "locality",
                        "name": { "default": "Lancaster" },
                        "_score": 12.5
                    },
                    {
                        "source": "whosonfirst",
                        "source_id": "654321",
                        "layer": "locality",
                        "name": { "default": "Lancaster" },
                        "_score": 11.0
                    }
                ]
            }),
        );
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["source"], "whosonfirst");
        assert_eq!(body["data"][0]["_score"], 11.0);
        assert_eq!(body["stats"]["input"], 2);
        assert_eq!(body["stats"]["duplicate_groups"], 1);
        assert_eq!(body["stats"]["mode"], "default");
    }

    #[tokio::test]
    async fn test_missing_clean_uses_defaults() {
        let data: Vec<Value> = (0..12)
            .map(|i| {
                json!({
                    "source": "openstreetmap",
                    "source_id": format!("node/{}", i),
                    "layer": "venue",
                    "name": { "default": format!("Cafe {}", i) }
                })
            })
            .collect();
        let response = app()
            .oneshot(post_json("/v1/dedupe", json!({ "data": data })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 10);
        assert_eq!(body["stats"]["survivors"], 12);
    }

    #[tokio::test]
    async fn test_geo_mode_and_unknown_mode() {
        let cannes = |source: &str, id: i64, lon: f64| {
            json!({
                "source": source,
                "source_id": id.to_string(),
                "layer": "locality",
                "name": { "default": "Cannes" },
                "parent": { "region_id": 85683323, "locality_id": id },
                "center_point": { "lon": lon, "lat": 43.55 }
            })
        };
        let data = json!([cannes("geonames", 6446684, 7.02), cannes("whosonfirst", 101748983, 7.01)]);

        let response = app()
            .oneshot(post_json(
                "/v1/dedupe",
                json!({ "clean": { "size": 10, "dedupe": "geo" }, "data": data.clone() }),
            ))
            .await
            .unwrap();
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["stats"]["mode"], "geo");

        let response = app()
            .oneshot(post_json(
                "/v1/dedupe",
                json!({ "clean": { "size": 10, "dedupe": "nearby" }, "data": data }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_badly_typed_record_fields_accepted() {
        let request = post_json(
            "/v1/dedupe",
            json!({
                "clean": { "size": 10 },
                "data": [
                    {
                        "source": "whosonfirst",
                        "source_id": "101718643",
                        "layer": "locality",
                        "name": { "default": "Lancaster" }
                    },
                    { "source": "geonames", "source_id": "1", "layer": 7, "name": "Lancaster" },
                    {
                        "source": "openaddresses",
                        "source_id": "2",
                        "layer": "address",
                        "name": { "default": "100 Main St" },
                        "address_parts": { "zip": 17602 },
                        "center_point": { "lon": "7.0", "lat": 43.55 }
                    }
                ]
            }),
        );
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"][1]["layer"], 7);
        assert_eq!(body["data"][2]["address_parts"]["zip"], 17602);
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let response = app()
            .oneshot(post_json("/v1/dedupe", json!({ "clean": { "size": 10 } })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
