//! Router behaviour over the built-in functions and an in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use driftnet_common::{RecordId, WebPage};
use driftnet_functions::{
    function_router, register_builtins, FunctionError, FunctionHandler, FunctionOutput,
    FunctionRegistry, FunctionResult, FunctionSpec,
};
use driftnet_store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

const COVID: &str = "https://www.nytimes.com/2024/09/19/nyregion/cuomo-nursing-homes-covid.html";
const ROAST: &str = "https://cooking.nytimes.com/recipes/1017937-mississippi-roast";

fn page(url: &str, text: &str, labels: &[&str]) -> WebPage {
    WebPage::builder()
        .id(RecordId::derive(url).unwrap())
        .url(url)
        .domain("nytimes.com")
        .text(text)
        .html(format!("<p>{text}</p>"))
        .labels(labels.iter().map(|l| l.to_string()).collect())
        .captured_at(Utc.with_ymd_and_hms(2024, 9, 19, 12, 0, 0).unwrap())
        .build()
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .seed("demo", page(COVID, "Cuomo on covid in nursing homes", &["politics"]))
        .await;
    store
        .seed("demo", page(ROAST, "A slow Mississippi roast", &["food"]))
        .await;
    store
}

async fn app() -> Router {
    let store = seeded_store().await;
    let registry = register_builtins(FunctionRegistry::builder(), store, "demo")
        .build()
        .unwrap();
    function_router(Arc::new(registry))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn post(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: Router, path: &str) -> (StatusCode, String) {
    let request = Request::get(path).body(Body::empty()).unwrap();
    let (status, bytes) = send(app, request).await;
    (status, String::from_utf8(bytes).unwrap())
}

#[tokio::test]
async fn count_and_list() {
    let app = app().await;

    let (status, body) = post(app.clone(), "/functions/records.count", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "index": "demo", "count": 2 }));

    let (status, body) = post(app, "/functions/records.list", json!({ "limit": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["records"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn get_by_url_returns_full_record() {
    let (status, body) = post(app().await, "/functions/records.get", json!({ "url": ROAST })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], ROAST);
    assert_eq!(body["html"], "<p>A slow Mississippi roast</p>");
}

#[tokio::test]
async fn get_missing_record_is_404() {
    let (status, body) = post(
        app().await,
        "/functions/records.get",
        json!({ "url": "https://example.com/missing" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no record"));
}

#[tokio::test]
async fn search_uses_search_bar_syntax() {
    let app = app().await;

    let (status, body) = post(
        app.clone(),
        "/functions/records.search",
        json!({ "q": "domain:nytimes.com text:covid" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["url"], COVID);
    assert!(results[0].get("html").is_none());

    let (_, body) = post(
        app,
        "/functions/records.search",
        json!({ "q": "politics food", "any": true }),
    )
    .await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bad_arguments_are_400() {
    let app = app().await;

    let (status, _) = post(app.clone(), "/functions/records.search", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(app.clone(), "/functions/records.search", json!({ "q": "html:x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(app.clone(), "/functions/records.count", json!({ "index": "../etc" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::post("/functions/records.count")
        .body(Body::from("[1, 2]"))
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_function_is_404_and_wrong_method_is_405() {
    let app = app().await;

    let (status, _) = post(app.clone(), "/functions/records.nope", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(app.clone(), "/functions/records.count").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = post(app, "/functions/pages.search", json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn search_page_renders_html() {
    let (status, html) = get(app().await, "/functions/pages.search?q=labels%3Afood").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(ROAST));
    assert!(!html.contains(COVID));
    assert!(html.contains(r#"value="labels:food""#));

    let (status, html) = get(app().await, "/functions/pages.search").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<form"));
    assert!(!html.contains("<ol>"));
}

#[tokio::test]
async fn lists_registered_functions() {
    let (status, body) = get(app().await, "/functions").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    let names: Vec<&str> = body["functions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["pages.search", "records.count", "records.get", "records.list", "records.search"]
    );
}

#[tokio::test]
async fn unavailable_store_is_500() {
    let store = seeded_store().await;
    store.set_unavailable(true);
    let registry = register_builtins(FunctionRegistry::builder(), store, "demo")
        .build()
        .unwrap();

    let (status, body) = post(
        function_router(Arc::new(registry)),
        "/functions/records.count",
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}

/// Records the highest number of overlapping calls.
#[derive(Default)]
struct Gauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

struct Slow(Arc<Gauge>);

#[async_trait]
impl FunctionHandler for Slow {
    async fn call(&self, _args: Value) -> FunctionResult<FunctionOutput> {
        let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(FunctionOutput::Json(json!({ "ok": true })))
    }
}

#[tokio::test]
async fn concurrency_is_bounded_per_function() {
    let gauge = Arc::new(Gauge::default());
    let registry = FunctionRegistry::builder()
        .register(FunctionSpec::json("slow").max_concurrency(1), Slow(gauge.clone()))
        .build()
        .unwrap();
    let app = function_router(Arc::new(registry));

    let (a, b, c) = tokio::join!(
        post(app.clone(), "/functions/slow", json!({})),
        post(app.clone(), "/functions/slow", json!({})),
        post(app, "/functions/slow", json!({})),
    );

    for (status, _) in [a, b, c] {
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
}

struct Failing;

#[async_trait]
impl FunctionHandler for Failing {
    async fn call(&self, _args: Value) -> FunctionResult<FunctionOutput> {
        Err(FunctionError::Internal(anyhow::anyhow!("boom")))
    }
}

struct WrongKind;

#[async_trait]
impl FunctionHandler for WrongKind {
    async fn call(&self, _args: Value) -> FunctionResult<FunctionOutput> {
        Ok(FunctionOutput::Html("<p>not json</p>".to_string()))
    }
}

#[tokio::test]
async fn handler_errors_are_500() {
    let registry = FunctionRegistry::builder()
        .register(FunctionSpec::json("failing"), Failing)
        .register(FunctionSpec::json("wrong-kind"), WrongKind)
        .build()
        .unwrap();
    let app = function_router(Arc::new(registry));

    let (status, body) = post(app.clone(), "/functions/failing", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "boom");

    let (status, _) = post(app, "/functions/wrong-kind", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn empty_post_body_means_no_arguments() {
    let request = Request::post("/functions/records.count")
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = send(app().await, request).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["count"], 2);
}
