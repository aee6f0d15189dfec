//! Columnar warehouse source (BigQuery `jobs.query` REST API).
//!
//! One SQL template serves both assets; only the fee expression, the
//! fixed-point divider, the table and the window change.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use super::MetricsSource;
use crate::config::WarehouseConfig;
use crate::error::AppError;
use crate::models::{Asset, LookbackWindow, RawAssetData, RawMonthlyRow};

pub const DEFAULT_WAREHOUSE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Instantiate the monthly aggregate query.
///
/// `divider` is the power-of-ten exponent that turns native units into the
/// display unit (8 for satoshi, 18 for wei).
pub fn render_query(fee_expression: &str, divider: u32, table: &str, years: u32) -> String {
    format!(
        "SELECT\n  \
           FORMAT_DATE('%Y-%m-01', DATE(block_timestamp)) AS month,\n  \
           COUNT(*) AS transaction_count,\n  \
           SUM({fee_expression}) / POW(10, {divider}) AS total_fee\n\
         FROM `{table}`\n\
         WHERE DATE(block_timestamp) >= DATE_SUB(CURRENT_DATE(), INTERVAL {years} YEAR)\n\
         GROUP BY month\n\
         ORDER BY month"
    )
}

/// Query for `asset`, using `table` when given and the public dataset otherwise.
pub fn query_for(asset: Asset, window: LookbackWindow, table: Option<&str>) -> String {
    render_query(
        asset.fee_expression(),
        asset.fee_divider(),
        table.unwrap_or(asset.default_table()),
        window.years(),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub job_complete: Option<bool>,
    pub job_reference: Option<JobReference>,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub total_rows: Option<String>,
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
pub struct FieldSchema {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TableRow {
    pub f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
pub struct TableCell {
    pub v: Option<String>,
}

impl QueryResponse {
    /// Fail when fewer rows arrived than the warehouse reported.
    pub fn ensure_complete(&self) -> Result<(), AppError> {
        let Some(total) = &self.total_rows else {
            return Ok(());
        };
        let total = total.parse::<usize>().map_err(|err| {
            AppError::MalformedResponse(format!("totalRows {:?}: {}", total, err))
        })?;
        if self.rows.len() < total {
            return Err(AppError::MalformedResponse(format!(
                "received {} of {} rows",
                self.rows.len(),
                total
            )));
        }
        Ok(())
    }

    /// Map result rows onto `RawMonthlyRow` by column name.
    pub fn into_monthly_rows(self) -> Result<Vec<RawMonthlyRow>, AppError> {
        let schema = self
            .schema
            .ok_or_else(|| AppError::MalformedResponse("response has no schema".to_string()))?;

        let column = |name: &str| {
            schema
                .fields
                .iter()
                .position(|field| field.name == name)
                .ok_or_else(|| {
                    AppError::MalformedResponse(format!("missing column `{}`", name))
                })
        };
        let month_idx = column("month")?;
        let count_idx = column("transaction_count")?;
        let fee_idx = column("total_fee")?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row_no, row)| {
                let cell = |idx: usize, name: &str| {
                    row.f
                        .get(idx)
                        .and_then(|cell| cell.v.as_deref())
                        .ok_or_else(|| {
                            AppError::MalformedResponse(format!(
                                "row {} has no value for `{}`",
                                row_no, name
                            ))
                        })
                };

                let month = cell(month_idx, "month")?.to_string();
                let transaction_count = cell(count_idx, "transaction_count")?
                    .parse::<u64>()
                    .map_err(|err| {
                        AppError::MalformedResponse(format!(
                            "row {}: transaction_count: {}",
                            row_no, err
                        ))
                    })?;
                let total_fee = cell(fee_idx, "total_fee")?.parse::<f64>().map_err(|err| {
                    AppError::MalformedResponse(format!("row {}: total_fee: {}", row_no, err))
                })?;

                Ok(RawMonthlyRow {
                    month,
                    transaction_count,
                    total_fee,
                })
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct WarehouseClient {
    base_url: String,
    project: String,
    token: String,
    timeout_ms: u64,
    tables: HashMap<Asset, String>,
    http: Client,
}

impl WarehouseClient {
    pub fn new(base_url: String, project: String, token: String) -> Self {
        Self {
            base_url,
            project,
            token,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            tables: HashMap::new(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &WarehouseConfig) -> Self {
        let mut client = Self::new(
            config.base_url.clone(),
            config.project.clone(),
            config.token.clone(),
        )
        .with_timeout_ms(config.timeout_ms);
        if let Some(table) = &config.bitcoin_table {
            client = client.with_table(Asset::Bitcoin, table.clone());
        }
        if let Some(table) = &config.ethereum_table {
            client = client.with_table(Asset::Ethereum, table.clone());
        }
        client
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Query `table` instead of the public dataset for `asset`.
    pub fn with_table(mut self, asset: Asset, table: String) -> Self {
        self.tables.insert(asset, table);
        self
    }

    fn query_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.base_url.trim_end_matches('/'),
            self.project
        )
    }

    fn results_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.query_url(), job_id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<QueryResponse, AppError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Auth(format!(
                "warehouse rejected credentials (HTTP {})",
                status
            )));
        }
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "warehouse returned HTTP {}",
                status
            )));
        }

        response
            .json::<QueryResponse>()
            .await
            .map_err(|err| AppError::MalformedResponse(err.to_string()))
    }

    /// Run the monthly aggregate query for one asset.
    pub async fn fetch_monthly(
        &self,
        asset: Asset,
        window: LookbackWindow,
    ) -> Result<Vec<RawMonthlyRow>, AppError> {
        let query = query_for(asset, window, self.tables.get(&asset).map(String::as_str));
        tracing::debug!("Warehouse query for {}:\n{}", asset, query);

        let request = self.http.post(self.query_url()).json(&QueryRequest {
            query: &query,
            use_legacy_sql: false,
            timeout_ms: self.timeout_ms,
        });
        let mut body = self.send(request).await?;

        if body.job_complete == Some(false) {
            return Err(AppError::QueryTimeout(format!(
                "{} query did not complete within {} ms",
                asset, self.timeout_ms
            )));
        }

        while let Some(token) = body.page_token.take() {
            let job = body.job_reference.as_ref().ok_or_else(|| {
                AppError::MalformedResponse("paged response has no job reference".to_string())
            })?;
            let mut params = vec![("pageToken", token)];
            if let Some(location) = &job.location {
                params.push(("location", location.clone()));
            }
            tracing::debug!("Fetching next {} result page of job {}", asset, job.job_id);

            let page = self
                .send(self.http.get(self.results_url(&job.job_id)).query(&params))
                .await?;
            body.rows.extend(page.rows);
            body.page_token = page.page_token;
        }

        body.ensure_complete()?;
        body.into_monthly_rows()
    }
}

#[async_trait]
impl MetricsSource for WarehouseClient {
    async fn fetch(&self, asset: Asset, window: LookbackWindow) -> Result<RawAssetData, AppError> {
        Ok(RawAssetData {
            asset,
            monthly: self.fetch_monthly(asset, window).await?,
            daily: Vec::new(),
        })
    }

    fn source_name(&self) -> &str {
        "warehouse"
    }
}
