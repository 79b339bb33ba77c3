use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::web::router;

fn app_with(analyzer: StubAnalyzer) -> axum::Router {
    let (recommender, _, _) = create_recommender(full_fetcher(), analyzer);
    router(Arc::new(recommender))
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health() {
    let (status, body) = send(app_with(StubAnalyzer::answering(ANALYSIS)), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recommend_points_to_extract() {
    let (status, body) =
        send(app_with(StubAnalyzer::answering(ANALYSIS)), "POST", "/recommend", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Use /extract endpoint"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_and_list() {
    let app = app_with(StubAnalyzer::answering(ANALYSIS));

    let (status, body) = send(
        app.clone(),
        "POST",
        "/extract",
        Some(json!({"url": ARTICLE_URL})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Rust Ownership Explained");
    assert_eq!(body["contentType"], "article");
    assert_eq!(body["recommendations"]["articles"][0]["type"], "article");
    assert!(body["recommendations"]["articles"][0].get("videoId").is_none());
    assert_eq!(body["recommendations"]["youtube"], json!([]));

    let (status, body) = send(app.clone(), "GET", "/api/content", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["url"], ARTICLE_URL);
    assert_eq!(body[0]["isVideo"], false);

    let (status, body) = send(app.clone(), "GET", "/api/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["url"], ARTICLE_URL);
    assert!(body[0]["timestamp"].is_string());
    assert_eq!(body[0]["recommendations"]["youtube"], json!([]));

    let (_, body) = send(app.clone(), "GET", "/api/index", None).await;
    assert_eq!(body, json!({"size": 1, "dimension": 768}));

    let (status, body) = send(
        app,
        "POST",
        "/similar",
        Some(json!({"text": "rust ownership", "k": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["url"], ARTICLE_URL);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_mapping() {
    let app = app_with(StubAnalyzer::answering(ANALYSIS));

    let (status, body) = send(app.clone(), "POST", "/extract", Some(json!({"url": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "URL is required"}));

    let (status, body) = send(
        app,
        "POST",
        "/similar",
        Some(json!({"url": "https://never.example"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let app = app_with(StubAnalyzer::failing(AnalyzerError::NotConfigured));
    let (status, body) = send(app, "POST", "/extract", Some(json!({"url": ARTICLE_URL}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("no analyzer configured"));
}
