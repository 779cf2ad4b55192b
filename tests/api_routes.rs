//! HTTP API tests driven through the router with `oneshot`

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use claim_verifier::api::{build_router, AppState};
use claim_verifier::{Binding, FetchError, Glossary, KnowledgeBase, Oracle, OracleError, Verifier};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Answers each stage by looking for a phrase its prompt carries
struct StageOracle;

#[async_trait]
impl Oracle for StageOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        if prompt.contains("describing the claim") {
            Ok(r#"{"subject":"Tokyo","property":"capital of","object":"Japan","queryDirection":"object","propertyCode":"P36","objectEntityId":"Q17"}"#.to_string())
        } else if prompt.contains("Write one SPARQL query") {
            Ok("SELECT ?capital ?capitalLabel WHERE { wd:Q17 wdt:P36 ?capital . }".to_string())
        } else {
            Ok(r#"{"status":"verified","confidence":90,"explanation":"Japan's capital is Tokyo."}"#.to_string())
        }
    }

    fn model_name(&self) -> &str {
        "stage-oracle"
    }
}

struct TokyoKnowledge;

#[async_trait]
impl KnowledgeBase for TokyoKnowledge {
    async fn select(&self, _query: &str) -> Result<Vec<Binding>, FetchError> {
        let mut row = Binding::new();
        row.insert(
            "capitalLabel".to_string(),
            json!({"type": "literal", "xml:lang": "en", "value": "Tokyo"}),
        );
        Ok(vec![row])
    }

    fn source_name(&self) -> &str {
        "Wikidata"
    }
}

fn app() -> axum::Router {
    let verifier = Verifier::new(
        Arc::new(StageOracle),
        Arc::new(TokyoKnowledge),
        Arc::new(Glossary::builtin().unwrap()),
    );

    build_router(
        AppState {
            verifier: Arc::new(verifier),
            max_claim_chars: 64,
        },
        1024,
    )
}

fn verify_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/verify")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_verify_returns_result() {
    let response = app()
        .oneshot(verify_request(
            json!({"claim": "Tokyo is the capital of Japan"}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["verified"], true);
    assert_eq!(body["confidence"], 90);
    assert_eq!(body["source"], "Wikidata");
    assert_eq!(body["explanation"], "Japan's capital is Tokyo.");
}

#[tokio::test]
async fn test_verify_rejects_blank_claim() {
    let response = app()
        .oneshot(verify_request(json!({"claim": "   "}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_verify_rejects_long_claim() {
    let claim = "Tokyo ".repeat(20);
    let response = app()
        .oneshot(verify_request(json!({ "claim": claim }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "CLAIM_TOO_LONG");
}

#[tokio::test]
async fn test_verify_rejects_oversized_body() {
    let padding = "x".repeat(4096);
    let response = app()
        .oneshot(verify_request(json!({ "claim": padding }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_metrics_exposes_verification_counters() {
    let app = app();

    app.clone()
        .oneshot(verify_request(
            json!({"claim": "Tokyo is the capital of Japan"}).to_string(),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("verifications_total"));
}
