//! Integration tests for the dashboard endpoints.
//!
//! Each test boots the full Axum router (same assembly as `main.rs`) using
//! `tower::ServiceExt::oneshot`; no live server or live warehouse needed.
//!
//! `build_test_app()` wires together:
//! - A `MemorySource` holding twelve years of monthly rows and a month of
//!   daily rows for both assets
//! - The `SvgRenderer`
//! - The complete `Router` returned ready for `oneshot`

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crypto_fee_analytics::{
    api::{create_dashboard_router, DashboardState},
    charts::SvgRenderer,
    models::{Asset, RawAssetData, RawDailyRow, RawMonthlyRow},
    sources::{MemorySource, SharedSource, WarehouseClient},
};

// ---- Helpers ----------------------------------------------------------------

fn make_asset(asset: Asset, fee_scale: f64) -> RawAssetData {
    let monthly = (2013..=2024)
        .flat_map(|year| (1..=12).map(move |month| (year, month)))
        .enumerate()
        .map(|(i, (year, month))| RawMonthlyRow {
            month: format!("{:04}-{:02}-01", year, month),
            // 2024-09 has no transactions
            transaction_count: if i == 140 { 0 } else { 1_000 + i as u64 * 10 },
            total_fee: fee_scale * (i as f64 + 1.0),
        })
        .collect();

    let daily = (1..=28)
        .rev()
        .map(|day| RawDailyRow {
            transaction_date: format!("2024-12-{:02}", day),
            daily_transaction_count: 300_000 + day as u64,
        })
        .collect();

    RawAssetData {
        asset,
        monthly,
        daily,
    }
}

fn build_test_app() -> (Router, Arc<MemorySource>) {
    let source = Arc::new(
        MemorySource::new()
            .with_asset(make_asset(Asset::Bitcoin, 0.5))
            .with_asset(make_asset(Asset::Ethereum, 12.0)),
    );
    let shared: SharedSource = source.clone();
    let app = create_dashboard_router(DashboardState::new(shared, Arc::new(SvgRenderer::new())));
    (app, source)
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn series_dates(charts: &Value, id: &str) -> Vec<NaiveDate> {
    let chart = charts["charts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == id)
        .unwrap_or_else(|| panic!("chart {} missing", id));
    chart["series"][0]["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["date"].as_str().unwrap().parse().unwrap())
        .collect()
}

// ---- Page -------------------------------------------------------------------

#[tokio::test]
async fn dashboard_page_renders_every_chart_section() {
    let (app, _) = build_test_app();

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();

    assert!(html.contains(r#"<option value="10" selected>10 years</option>"#));
    assert_eq!(html.matches("<section ").count(), 8);
    assert!(html.contains("<h2>Bitcoin Transaction Volume Over 10 Years</h2>"));
    assert!(html.contains("<h2>Daily Transactions: Bitcoin vs Ethereum</h2>"));
}

#[tokio::test]
async fn dashboard_page_follows_selected_window() {
    let (app, _) = build_test_app();

    let html = String::from_utf8(body_bytes(get(&app, "/?years=2").await).await).unwrap();

    assert!(html.contains(r#"<option value="2" selected>2 years</option>"#));
    assert!(html.contains("Ethereum Transaction Volume Over 2 Years"));
}

#[tokio::test]
async fn unsupported_window_is_rejected() {
    let (app, source) = build_test_app();

    let response = get(&app, "/?years=3").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("3"));
    assert_eq!(source.fetch_count(), 0);
}

// ---- Chart JSON -------------------------------------------------------------

#[tokio::test]
async fn switching_window_refetches_and_narrows_the_range() {
    let (app, source) = build_test_app();

    let ten = body_json(get(&app, "/api/charts?years=10").await).await;
    assert_eq!(source.fetch_count(), 2);
    let two = body_json(get(&app, "/api/charts?years=2").await).await;
    assert_eq!(source.fetch_count(), 4);

    assert_eq!(ten["years"], 10);
    assert_eq!(two["years"], 2);

    let ten_dates = series_dates(&ten, "btc-volume");
    let two_dates = series_dates(&two, "btc-volume");
    assert!(two_dates.len() < ten_dates.len());
    assert!(two_dates.first().unwrap() >= ten_dates.first().unwrap());
    assert!(two_dates.last().unwrap() <= ten_dates.last().unwrap());
    assert!(two_dates.iter().all(|d| ten_dates.contains(d)));
}

#[tokio::test]
async fn undefined_average_fee_is_null_in_json() {
    let (app, _) = build_test_app();

    let json = body_json(get(&app, "/api/charts").await).await;
    let point_for = |id: &str| {
        let chart = json["charts"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["id"] == id)
            .unwrap();
        chart["series"][0]["points"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["date"] == "2024-09-01")
            .unwrap()
            .clone()
    };

    assert!(point_for("btc-avg-fee")["value"].is_null());
    assert_eq!(point_for("btc-volume")["value"], 0.0);
    assert!(point_for("btc-total-fee")["value"].is_number());
    assert_eq!(json["source"], "memory");
}

#[tokio::test]
async fn daily_series_are_sorted_ascending() {
    let (app, _) = build_test_app();

    let json = body_json(get(&app, "/api/charts?years=10").await).await;
    let dates = series_dates(&json, "daily-comparison");
    assert_eq!(dates.len(), 28);
    assert!(dates.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn matching_etag_returns_not_modified() {
    let (app, _) = build_test_app();

    let first = get(&app, "/api/charts?years=5").await;
    assert_eq!(first.status(), StatusCode::OK);
    let etag = first
        .headers()
        .get(header::ETAG)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let second = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/charts?years=5")
                .header(header::IF_NONE_MATCH, etag.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(second).await.is_empty());
}

// ---- Health / upstream failures --------------------------------------------

#[tokio::test]
async fn health_returns_plain_ok_without_fetching() {
    let (app, source) = build_test_app();

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    assert_eq!(body_bytes(response).await, b"ok");
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn unparseable_source_date_is_an_internal_error() {
    let mut bitcoin = make_asset(Asset::Bitcoin, 0.5);
    bitcoin.monthly[0].month = "bogus".to_string();
    let source: SharedSource = Arc::new(
        MemorySource::new()
            .with_asset(bitcoin)
            .with_asset(make_asset(Asset::Ethereum, 12.0)),
    );
    let app = create_dashboard_router(DashboardState::new(source, Arc::new(SvgRenderer::new())));

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn warehouse_failure_surfaces_as_bad_gateway() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/demo/queries"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client: SharedSource = Arc::new(WarehouseClient::new(
        mock_server.uri(),
        "demo".to_string(),
        "token".to_string(),
    ));
    let app = create_dashboard_router(DashboardState::new(client, Arc::new(SvgRenderer::new())));

    let response = get(&app, "/?years=5").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("500"));
}
