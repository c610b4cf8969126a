use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::identity::page_id;
use search_core::indexer::rebuild_index;
use search_core::phrase::StopwordChunker;
use search_core::rank::rank_pages;
use search_core::{Page, RankConfig, Store};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const A: &str = "https://site.test";
const B: &str = "https://site.test/b";
const C: &str = "https://site.test/c";

fn build_tiny_db(path: &Path) {
    let mut store = Store::open(path).unwrap();
    for (url, title, body) in [
        (A, "Home", "welcome visitors index"),
        (B, "Rust", "rust compiler internals"),
        (C, "Garden", "gardening tips flowers"),
    ] {
        store.insert_page(&Page::new(url, title, body, body.len() as i64, 784_111_777)).unwrap();
    }
    store.insert_edges(&[(page_id(A), page_id(B)), (page_id(A), page_id(C))]).unwrap();
    rebuild_index(&mut store, &StopwordChunker::default()).unwrap();
    rank_pages(&mut store, &RankConfig::default()).unwrap();
}

fn app() -> (tempfile::TempDir, Router) {
    let dir = tempdir().unwrap();
    let db = dir.path().join("search.db");
    build_tiny_db(&db);
    let app = server::build_app(&db).unwrap();
    (dir, app)
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn search(body: Value) -> Request<Body> {
    Request::post("/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn search_returns_decorated_results() {
    let (_dir, app) = app();
    let (status, body) = call(app, search(json!({ "query": "compiler" }))).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["query"], "compiler");
    assert!(json["time_taken"].is_u64());
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);

    let hit = &results[0];
    assert_eq!(hit["id"].as_u64().unwrap(), page_id(B) as u64);
    assert_eq!(hit["url"], B);
    assert_eq!(hit["title"], "Rust");
    assert_eq!(hit["time"], "1994-11-06 08:49:37");
    assert_eq!(hit["score"].as_f64().unwrap(), 50.0);
    assert_eq!(hit["parent_links"], json!([A]));
    assert_eq!(hit["child_links"], json!([]));
    let keywords = hit["keywords"].as_array().unwrap();
    assert!(keywords.len() <= 5);
    assert_eq!(keywords[0], json!(["rust", 2]));
}

#[tokio::test]
async fn accepts_the_web_frontend_request_body() {
    let (_dir, app) = app();
    let (status, body) = call(app.clone(), search(json!({ "searchbar": "compiler" }))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["query"], "compiler");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["url"], B);
    assert!(results[0]["keywords"].as_array().unwrap().iter().all(|pair| pair.as_array().unwrap().len() == 2));

    // no query field at all searches for nothing
    let (status, body) = call(app, search(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn negative_related_doc_means_none_and_unknown_yields_nothing() {
    let (_dir, app) = app();
    let (_, body) = call(app.clone(), search(json!({ "query": "compiler", "related_doc": -1 }))).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let (_, body) = call(app.clone(), search(json!({ "query": "compiler", "related_doc": 12345 }))).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());

    let (_, body) = call(app, search(json!({ "query": "compiler", "related_doc": 1_i64 << 40 }))).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn related_doc_keeps_matching_pages() {
    let (_dir, app) = app();
    let (status, body) =
        call(app, search(json!({ "query": "compiler", "related_doc": page_id(B) }))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["url"], B);
}

#[tokio::test]
async fn keywords_lists_every_indexed_keyword() {
    let (_dir, app) = app();
    let (status, body) = call(app, Request::get("/keywords").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let keywords: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert!(keywords.contains(&"compil".to_string()));
    assert!(keywords.contains(&"rust compil intern".to_string()));
    let mut sorted = keywords.clone();
    sorted.sort();
    assert_eq!(keywords, sorted);
}

#[tokio::test]
async fn health_and_malformed_requests() {
    let (_dir, app) = app();
    let (status, body) = call(app.clone(), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");

    let bad = Request::post("/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = call(app, bad).await;
    assert!(status.is_client_error());
}
