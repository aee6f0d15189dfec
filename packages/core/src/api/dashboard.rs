//! Interactive dashboard.
//!
//! Every request runs the full pipeline for the selected lookback window:
//! fetch, normalize, build the chart catalog, render. Nothing is kept
//! between requests except the source and renderer handles.

use std::fmt::Write;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{Html, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use super::headers::{compute_etag, if_none_match_matches, revalidate};
use super::health::health;
use crate::charts::svg::escape;
use crate::charts::{build_charts, ChartRenderer, ChartSpec};
use crate::error::AppError;
use crate::models::LookbackWindow;
use crate::sources::{load_dataset, SharedSource};

#[derive(Clone)]
pub struct DashboardState {
    pub source: SharedSource,
    pub renderer: Arc<dyn ChartRenderer + Send + Sync>,
}

impl DashboardState {
    pub fn new(source: SharedSource, renderer: Arc<dyn ChartRenderer + Send + Sync>) -> Self {
        Self { source, renderer }
    }
}

/// Create the dashboard router.
pub fn create_dashboard_router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/charts", get(chart_specs))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub years: Option<String>,
}

impl WindowQuery {
    /// Selected window; ten years when the parameter is absent or blank.
    pub fn window(&self) -> Result<LookbackWindow, AppError> {
        match self.years.as_deref().map(str::trim) {
            None | Some("") => Ok(LookbackWindow::default()),
            Some(raw) => raw.parse(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChartsResponse<'a> {
    pub years: u32,
    pub source: &'a str,
    pub charts: Vec<ChartSpec>,
}

async fn build_for_window(
    state: &DashboardState,
    window: LookbackWindow,
) -> Result<Vec<ChartSpec>, AppError> {
    let dataset = load_dataset(state.source.as_ref(), window).await?;
    Ok(build_charts(&dataset.bitcoin, &dataset.ethereum, window))
}

/// HTML page: window selector plus one titled section per chart.
async fn dashboard_page(
    State(state): State<DashboardState>,
    Query(params): Query<WindowQuery>,
) -> Result<Html<String>, AppError> {
    let window = params.window()?;
    tracing::info!("Rendering dashboard for {}-year window", window.years());

    let charts = build_for_window(&state, window).await?;
    let page = render_page(window, &charts, state.renderer.as_ref())?;
    Ok(Html(page))
}

/// Chart specifications as JSON, with ETag revalidation.
async fn chart_specs(
    State(state): State<DashboardState>,
    Query(params): Query<WindowQuery>,
    request_headers: HeaderMap,
) -> Result<Response, AppError> {
    let window = params.window()?;
    let charts = build_for_window(&state, window).await?;

    let payload = ChartsResponse {
        years: window.years(),
        source: state.source.source_name(),
        charts,
    };
    let body = serde_json::to_vec(&payload)
        .map_err(|err| AppError::Internal(format!("Failed to serialize charts: {}", err)))?;
    let etag = compute_etag(&body);

    let response = if if_none_match_matches(&request_headers, &etag) {
        Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::CACHE_CONTROL, revalidate())
            .header(header::ETAG, etag.as_str())
            .body(Body::empty())
    } else {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CACHE_CONTROL, revalidate())
            .header(header::ETAG, etag.as_str())
            .body(Body::from(body))
    };

    response.map_err(|err| AppError::Internal(format!("Failed to build response: {}", err)))
}

const PAGE_STYLE: &str = "body{font-family:DejaVu Sans,Helvetica,Arial,sans-serif;margin:0;background:#F7F7F7;color:#333}\
header{padding:16px 32px;background:#FFF;border-bottom:1px solid #DDD}\
main{padding:16px 32px}\
section{background:#FFF;margin:0 0 24px;padding:8px 16px;border:1px solid #DDD}\
svg{max-width:100%;height:auto}";

/// Assemble the dashboard page from already-built chart specs.
pub fn render_page(
    window: LookbackWindow,
    charts: &[ChartSpec],
    renderer: &(dyn ChartRenderer + Send + Sync),
) -> Result<String, AppError> {
    let mut page = String::new();
    writeln!(page, "<!DOCTYPE html>")?;
    writeln!(page, r#"<html lang="en"><head><meta charset="utf-8">"#)?;
    writeln!(page, "<title>Crypto Fee Analytics</title>")?;
    writeln!(page, "<style>{}</style></head><body>", PAGE_STYLE)?;
    writeln!(page, "<header><h1>Bitcoin &amp; Ethereum Transaction Fees</h1>")?;
    writeln!(page, r#"<form method="get" action="/">"#)?;
    writeln!(page, r#"<label for="years">Lookback window</label>"#)?;
    writeln!(
        page,
        r#"<select id="years" name="years" onchange="this.form.submit()">"#
    )?;
    for option in LookbackWindow::ALL {
        let selected = if option == window { " selected" } else { "" };
        writeln!(
            page,
            r#"<option value="{years}"{selected}>{years} years</option>"#,
            years = option.years(),
            selected = selected,
        )?;
    }
    writeln!(page, "</select>")?;
    writeln!(page, r#"<noscript><button type="submit">Show</button></noscript>"#)?;
    writeln!(page, "</form></header>")?;

    writeln!(page, "<main>")?;
    for spec in charts {
        let figure = renderer.render(spec)?;
        writeln!(
            page,
            r#"<section id="{}"><h2>{}</h2>"#,
            escape(&spec.id),
            escape(&spec.title)
        )?;
        page.push_str(&figure);
        writeln!(page, "</section>")?;
    }
    writeln!(page, "</main></body></html>")?;

    Ok(page)
}
