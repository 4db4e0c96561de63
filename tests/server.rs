//! HTTP API tests against a live server on an ephemeral port.

mod common;

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use common::*;
use docqa::server::router;
use docqa_core::embedding::Embedder;

async fn spawn(tmp: &TempDir, embedder: Arc<dyn Embedder>) -> String {
    let ctx = open_context(
        test_config(tmp.path()),
        embedder,
        Arc::new(StaticGenerator::new("Polarization increased sharply.")),
    )
    .await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(Arc::new(ctx))).await.unwrap();
    });
    format!("http://{}", addr)
}

fn seed_corpus(tmp: &TempDir) {
    let docs = tmp.path().join("docs");
    write_pdf(&docs, "2019_trade.pdf", &paragraph("trade", 60));
    write_pdf(&docs, "2021_polarization.pdf", &paragraph("polarization", 60));
}

#[tokio::test]
async fn health_reports_version_and_providers() {
    let tmp = TempDir::new().unwrap();
    let base = spawn(&tmp, Arc::new(HashEmbedder::new())).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["embedding_configured"], true);
    assert_eq!(body["generation_configured"], true);
}

#[tokio::test]
async fn reprocess_then_query() {
    let tmp = TempDir::new().unwrap();
    seed_corpus(&tmp);
    let base = spawn(&tmp, Arc::new(HashEmbedder::new())).await;
    let client = reqwest::Client::new();

    // Nothing indexed yet.
    let empty: Value = client
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "What about polarization?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["status"], "not_found");
    assert_eq!(empty["sources"], json!([]));

    let resp = client
        .post(format!("{}/reprocess", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let summary: Value = resp.json().await.unwrap();
    assert_eq!(summary["processed"], 2);
    assert_eq!(summary["skipped"], 0);
    assert_eq!(summary["errors"], json!([]));

    let years: Value = client
        .get(format!("{}/years", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(years, json!({ "available_years": [2019, 2021] }));

    let stats: Value = client
        .get(format!("{}/stats", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["document_count"], 2);
    assert_eq!(stats["year_min"], 2019);
    assert_eq!(stats["year_max"], 2021);

    let answer: Value = client
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "What about polarization?", "year": 2021 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer["status"], "answered");
    assert_eq!(answer["answer"], "Polarization increased sharply.");
    assert_eq!(answer["year_filter"], 2021);
    let sources = answer["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["filename"], "2021_polarization.pdf");
    assert_eq!(sources[0]["year"], 2021);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let base = spawn(&tmp, Arc::new(HashEmbedder::new())).await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "question": "   " }),
        json!({ "year": 2021 }),
    ] {
        let resp = client
            .post(format!("{}/ask", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body: {}", body);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "validation_error");
        assert!(err["error"]["message"].is_string());
    }

    // An unusual year is a valid filter that simply matches nothing.
    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "When?", "year": 1850 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "not_found");
    assert_eq!(body["year_filter"], 1850);

    let resp = client
        .post(format!("{}/ask", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn embedding_outage_maps_to_bad_gateway() {
    let tmp = TempDir::new().unwrap();
    let base = spawn(&tmp, Arc::new(DownEmbedder)).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "Anything?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "embedding_error");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let tmp = TempDir::new().unwrap();
    let base = spawn(&tmp, Arc::new(HashEmbedder::new())).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/health", base))
        .header("origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
