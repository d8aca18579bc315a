use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::RwLock;
use quarry_core::catalog::Language;
use quarry_core::ingest::ArticleRecord;
use quarry_core::Catalog;
use serde_json::Value;
use server::{build_app, AppState};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";

fn write_articles(dir: &std::path::Path) {
    fs::write(
        dir.join("rust.json"),
        r#"{"title":"Rust release","article":"The new rust compiler is faster. Rust users cheered.","url":"https://example.com/rust"}"#,
    )
    .unwrap();
    fs::write(dir.join("go.json"), r#"{"title":"Go release","article":"The go toolchain shipped and rust was mentioned."}"#).unwrap();
    fs::write(dir.join("python.json"), r#"{"title":"Python news","article":"The python team published a roadmap."}"#).unwrap();
}

fn app_with(catalog: Catalog) -> Router {
    build_app(AppState::new(Arc::new(RwLock::new(catalog)), Some(TOKEN.to_string())))
}

fn preloaded(dir: &std::path::Path) -> Router {
    write_articles(dir);
    let mut catalog = Catalog::default();
    for name in ["rust.json", "go.json", "python.json"] {
        let path = dir.join(name);
        let record: ArticleRecord = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        catalog.index_article(Language::English, &record, &path.display().to_string());
    }
    app_with(catalog)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = preloaded(dir.path());

    let (status, json) = get(app, "/search?q=rust&grammar=infix&ranking=tfidf&k=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], 0);
    assert_eq!(arr[1]["doc_id"], 1);
    assert_eq!(arr[0]["title"], "Rust release");
    assert_eq!(arr[0]["url"], "https://example.com/rust");
    assert!(arr[0]["snippet"].as_str().unwrap().contains("<em>rust</em>"));
    assert_eq!(json["relevant_terms"], serde_json::json!(["rust"]));
}

#[tokio::test]
async fn prefix_queries_and_negation() {
    let dir = tempdir().unwrap();
    let app = preloaded(dir.path());

    let (status, json) = get(app, "/search?q=%26(release,!(go))&ranking=none").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["doc_id"], 0);
}

#[tokio::test]
async fn malformed_query_is_a_bad_request() {
    let dir = tempdir().unwrap();
    let app = preloaded(dir.path());

    let (status, json) = get(app, "/search?q=%26(rust").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing )");
}

#[tokio::test]
async fn deeply_nested_query_is_a_bad_request() {
    let dir = tempdir().unwrap();
    let app = preloaded(dir.path());

    let uri = format!("/search?q={}rust&grammar=infix", "!".repeat(5_000));
    let (status, json) = get(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Query is nested too deeply");

    let (status, _) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_language_index_is_reported() {
    let dir = tempdir().unwrap();
    let app = preloaded(dir.path());

    let (status, json) = get(app.clone(), "/search?q=rust&lang=cs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "There are no files indexed in the czech language");

    let (status, _) = get(app, "/search?q=rust&lang=de").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn document_and_stats_endpoints() {
    let dir = tempdir().unwrap();
    let app = preloaded(dir.path());

    let (status, json) = get(app.clone(), "/doc/en/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Python news");
    assert_eq!(json["language"], "english");

    let (status, _) = get(app.clone(), "/doc/en/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["english"]["documents"], 3);
}

#[tokio::test]
async fn batch_indexing_requires_the_admin_token() {
    let dir = tempdir().unwrap();
    write_articles(dir.path());
    let app = app_with(Catalog::default());
    let body = serde_json::json!({ "paths": [dir.path()], "language": "en" }).to_string();

    let req = Request::post("/index/batch")
        .header("content-type", "application/json")
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/index/batch")
        .header("content-type", "application/json")
        .header("X-ADMIN-TOKEN", TOKEN)
        .body(Body::from(body))
        .unwrap();
    let (status, report) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["indexed"], 3);
    assert_eq!(report["cancelled"], false);

    let (_, json) = get(app.clone(), "/search?q=python").await;
    assert_eq!(json["total_hits"], 1);

    let req = Request::post("/index/cancel").header("X-ADMIN-TOKEN", TOKEN).body(Body::empty()).unwrap();
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cancelled"], false);
}

#[tokio::test]
async fn dropped_batch_request_releases_the_slot() {
    let dir = tempdir().unwrap();
    for i in 0..500 {
        let body = format!(r#"{{"title":"Story {i}","article":"The market moved on day {i}."}}"#);
        fs::write(dir.path().join(format!("{i:04}.json")), body).unwrap();
    }
    let state = AppState::new(Arc::new(RwLock::new(Catalog::default())), Some(TOKEN.to_string()));
    let app = build_app(state.clone());
    let body = serde_json::json!({ "paths": [dir.path()], "language": "en" }).to_string();
    let batch = || {
        Request::post("/index/batch")
            .header("content-type", "application/json")
            .header("X-ADMIN-TOKEN", TOKEN)
            .body(Body::from(body.clone()))
            .unwrap()
    };

    // Poll the request until the batch has been handed off, then abandon it.
    let mut pending = Box::pin(app.clone().oneshot(batch()));
    loop {
        tokio::select! {
            biased;
            _ = &mut pending => break,
            _ = tokio::task::yield_now() => {}
        }
        if state.running_batch.lock().is_some() {
            break;
        }
    }
    drop(pending);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    while state.running_batch.lock().is_some() {
        assert!(tokio::time::Instant::now() < deadline, "batch slot was never released");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, report) = send(app, batch()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["processed"], 500);
    assert_eq!(report["cancelled"], false);
    assert_eq!(state.catalog.read().stats()[&Language::English].documents, 500);
}
