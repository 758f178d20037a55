//! Integration tests for the paged query layer.
//!
//! Tests run against an in-process Axum server bound to an ephemeral
//! port, serving a paginated builds endpoint with per-page behaviors:
//! page 2 responds slowly, page 3 always fails. This exercises the
//! stale-while-refreshing contract and newest-request-wins resolution
//! over a real HTTP round trip.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::time::sleep;

use changes_api::{ApiClient, ApiConfig, PagedQuery, QueryParams};
use changes_types::Build;

/// Delay applied to page 2 so tests can observe in-flight state.
const SLOW_PAGE_DELAY: Duration = Duration::from_millis(400);

#[derive(Default)]
struct MockState {
    hits: AtomicUsize,
}

fn page_body(page: u32) -> serde_json::Value {
    serde_json::json!([
        {
            "id": uuid::Uuid::new_v4(),
            "name": format!("build-p{page}-a"),
            "status": "finished",
            "result": "passed",
        },
        {
            "id": uuid::Uuid::new_v4(),
            "name": format!("build-p{page}-b"),
            "status": "in_progress",
        },
    ])
}

async fn builds_handler(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let page: u32 = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);

    match page {
        2 => sleep(SLOW_PAGE_DELAY).await,
        3 => return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => {}
    }

    let next = page.saturating_add(1);
    let prev = page.saturating_sub(1);
    let link = format!(
        "<http://mock/api/0/projects/x/builds/?page={next}>; rel=\"next\", \
         <http://mock/api/0/projects/x/builds/?page={prev}>; rel=\"previous\""
    );
    (
        [(header::LINK, link)],
        axum::Json(page_body(page)),
    )
        .into_response()
}

async fn start_mock() -> (SocketAddr, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/api/0/projects/x/builds/", get(builds_handler))
        .with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn builds_query(addr: SocketAddr) -> PagedQuery<Build> {
    let config = ApiConfig::with_base_url(format!("http://{addr}/api/0"));
    let client = ApiClient::new(&config).unwrap();
    PagedQuery::new(client, "/projects/x/builds/")
}

fn page_param(page: u32) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert(String::from("page"), page.to_string());
    params
}

fn shown_names(query: &PagedQuery<Build>) -> Vec<String> {
    query
        .data_to_show()
        .map(|view| view.items.into_iter().map(|b| b.name).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn initialize_loads_first_page() {
    let (addr, _) = start_mock().await;
    let query = builds_query(addr);

    assert!(query.has_not_loaded_initial_data());
    query.initialize(QueryParams::new()).await;

    assert!(!query.has_not_loaded_initial_data());
    assert!(!query.is_loading_updated_data());
    assert!(!query.failed_to_load_updated_data());
    assert_eq!(shown_names(&query), vec!["build-p1-a", "build-p1-b"]);
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let (addr, state) = start_mock().await;
    let query = builds_query(addr);

    query.initialize(QueryParams::new()).await;
    query.initialize(page_param(4)).await;

    assert_eq!(state.hits.load(Ordering::SeqCst), 1);
    assert_eq!(shown_names(&query), vec!["build-p1-a", "build-p1-b"]);
}

#[tokio::test]
async fn stale_page_stays_visible_during_refresh() {
    let (addr, _) = start_mock().await;
    let query = Arc::new(builds_query(addr));
    query.initialize(QueryParams::new()).await;

    let refresh = {
        let query = Arc::clone(&query);
        tokio::spawn(async move {
            query.update_with_params(page_param(2), false).await;
        })
    };
    sleep(Duration::from_millis(150)).await;

    // Refresh is in flight: the old page is still what renders.
    assert_eq!(shown_names(&query), vec!["build-p1-a", "build-p1-b"]);
    assert!(query.is_loading_updated_data());
    assert!(!query.failed_to_load_updated_data());

    refresh.await.unwrap();
    assert_eq!(shown_names(&query), vec!["build-p2-a", "build-p2-b"]);
    assert!(!query.is_loading_updated_data());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_page_flagged() {
    let (addr, _) = start_mock().await;
    let query = builds_query(addr);
    query.initialize(QueryParams::new()).await;

    query.update_with_params(page_param(3), false).await;

    // The old page survives the failure, flagged as errored.
    assert_eq!(shown_names(&query), vec!["build-p1-a", "build-p1-b"]);
    assert!(query.failed_to_load_updated_data());
    assert!(!query.is_loading_updated_data());
    assert_eq!(query.last_error().and_then(|e| e.status), Some(500));

    // A later successful refresh recovers cleanly.
    query.update_with_params(page_param(4), false).await;
    assert_eq!(shown_names(&query), vec!["build-p4-a", "build-p4-b"]);
    assert!(!query.failed_to_load_updated_data());
    assert!(query.last_error().is_none());
}

#[tokio::test]
async fn first_load_failure_reports_not_loaded() {
    let (addr, _) = start_mock().await;
    let query = builds_query(addr);

    query.initialize(page_param(3)).await;

    assert!(query.data_to_show().is_none());
    assert!(query.has_not_loaded_initial_data());
    assert!(!query.failed_to_load_updated_data());
    assert_eq!(query.last_error().and_then(|e| e.status), Some(500));
}

#[tokio::test]
async fn newest_issued_request_wins() {
    let (addr, _) = start_mock().await;
    let query = Arc::new(builds_query(addr));
    query.initialize(QueryParams::new()).await;

    // Slow refresh to page 2, then a fast refresh to page 5 issued
    // while the first is still in flight.
    let slow = {
        let query = Arc::clone(&query);
        tokio::spawn(async move {
            query.update_with_params(page_param(2), false).await;
        })
    };
    sleep(Duration::from_millis(100)).await;
    query.update_with_params(page_param(5), false).await;

    assert_eq!(shown_names(&query), vec!["build-p5-a", "build-p5-b"]);

    // The slow response arrives later and must be discarded.
    slow.await.unwrap();
    sleep(SLOW_PAGE_DELAY).await;
    assert_eq!(shown_names(&query), vec!["build-p5-a", "build-p5-b"]);
}

#[tokio::test]
async fn pagination_links_round_trip() {
    let (addr, _) = start_mock().await;
    let query = builds_query(addr);
    query.initialize(page_param(4)).await;

    let links = query.pagination_links();
    let next = links.next.unwrap();
    assert_eq!(next.params.get("page").map(String::as_str), Some("5"));

    query.follow(next).await;
    assert_eq!(shown_names(&query), vec!["build-p5-a", "build-p5-b"]);
    assert_eq!(
        query
            .shown_params()
            .and_then(|p| p.get("page").cloned()),
        Some(String::from("5"))
    );
}

#[tokio::test]
async fn reset_page_clears_cursor_params() {
    let (addr, _) = start_mock().await;
    let query = builds_query(addr);
    query.initialize(page_param(4)).await;

    let mut filter = QueryParams::new();
    filter.insert(String::from("result"), String::from("failed"));
    query.update_with_params(filter, true).await;

    let params = query.target_params();
    assert!(!params.contains_key("page"));
    assert_eq!(params.get("result").map(String::as_str), Some("failed"));
    // Back on the first page.
    assert_eq!(shown_names(&query), vec!["build-p1-a", "build-p1-b"]);
}
