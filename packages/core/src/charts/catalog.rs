//! The fixed, ordered set of charts produced from a dataset.

use super::{palette, ChartSpec, DataPoint, Series};
use crate::models::{AssetMetrics, LookbackWindow, MonthlyMetrics};

fn monthly_points(metrics: &AssetMetrics, value: fn(&MonthlyMetrics) -> f64) -> Vec<DataPoint> {
    metrics
        .monthly
        .iter()
        .map(|row| DataPoint {
            date: row.month,
            value: value(row),
        })
        .collect()
}

fn daily_points(metrics: &AssetMetrics) -> Vec<DataPoint> {
    metrics
        .daily
        .iter()
        .map(|row| DataPoint {
            date: row.transaction_date,
            value: row.daily_transaction_count as f64,
        })
        .collect()
}

fn volume(row: &MonthlyMetrics) -> f64 {
    row.transaction_count as f64
}

fn total_fee(row: &MonthlyMetrics) -> f64 {
    row.total_fee
}

fn avg_fee(row: &MonthlyMetrics) -> f64 {
    row.avg_fee
}

/// Build every chart, in display order.
///
/// Per asset: volume, total fee, average fee; then the average-fee and
/// daily-transaction comparisons. The daily comparison is left out when
/// neither asset has daily rows.
pub fn build_charts(
    bitcoin: &AssetMetrics,
    ethereum: &AssetMetrics,
    window: LookbackWindow,
) -> Vec<ChartSpec> {
    let years = window.years();
    let mut charts = vec![
        ChartSpec::new(
            "btc-volume",
            format!("Bitcoin Transaction Volume Over {} Years", years),
            "Month",
            "Number of Transactions Per Month",
        )
        .with_series(
            Series::new("Bitcoin", palette::DEFAULT, monthly_points(bitcoin, volume))
                .with_markers(),
        ),
        ChartSpec::new(
            "btc-total-fee",
            "Bitcoin Total Transaction Fees (BTC)",
            "Month",
            "Total Fees in BTC Per Month",
        )
        .with_series(
            Series::new("Bitcoin", palette::PURPLE, monthly_points(bitcoin, total_fee))
                .with_markers(),
        ),
        ChartSpec::new(
            "btc-avg-fee",
            "Bitcoin Average Fee Per Transaction (BTC)",
            "Month",
            "Avg Fee (BTC)",
        )
        .with_series(
            Series::new("Bitcoin", palette::DARK_BLUE, monthly_points(bitcoin, avg_fee))
                .with_markers(),
        ),
        ChartSpec::new(
            "eth-volume",
            format!("Ethereum Transaction Volume Over {} Years", years),
            "Month",
            "Number of Transactions Per Month",
        )
        .with_series(
            Series::new("Ethereum", palette::GREEN, monthly_points(ethereum, volume))
                .with_markers(),
        ),
        ChartSpec::new(
            "eth-total-fee",
            "Ethereum Total Gas Fees (ETH)",
            "Month",
            "Total Gas Fees in ETH Per Month",
        )
        .with_series(
            Series::new("Ethereum", palette::RED, monthly_points(ethereum, total_fee))
                .with_markers(),
        ),
        ChartSpec::new(
            "eth-avg-fee",
            "Ethereum Average Fee Per Transaction (ETH)",
            "Month",
            "Avg Fee (ETH)",
        )
        .with_series(
            Series::new("Ethereum", palette::DARK_RED, monthly_points(ethereum, avg_fee))
                .with_markers(),
        ),
        ChartSpec::new(
            "avg-fee-comparison",
            "BTC vs ETH Average Transaction Fee Comparison",
            "Month",
            "Avg Fee (BTC / ETH)",
        )
        .with_series(Series::new(
            "Bitcoin Avg Fee (BTC)",
            palette::BLUE,
            monthly_points(bitcoin, avg_fee),
        ))
        .with_series(Series::new(
            "Ethereum Avg Fee (ETH)",
            palette::ORANGE,
            monthly_points(ethereum, avg_fee),
        ))
        .with_legend(),
    ];

    if !bitcoin.daily.is_empty() || !ethereum.daily.is_empty() {
        charts.push(
            ChartSpec::new(
                "daily-comparison",
                "Daily Transactions: Bitcoin vs Ethereum",
                "Date",
                "Number of Transactions",
            )
            .with_series(
                Series::new("Bitcoin", palette::BLUE, daily_points(bitcoin)).with_opacity(0.7),
            )
            .with_series(
                Series::new("Ethereum", palette::ORANGE, daily_points(ethereum)).with_opacity(0.7),
            )
            .with_legend()
            .with_size(1400, 700),
        );
    }

    charts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Asset, DailyMetrics};
    use chrono::NaiveDate;

    fn metrics(asset: Asset, with_daily: bool) -> AssetMetrics {
        let month = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        AssetMetrics {
            asset,
            monthly: vec![
                MonthlyMetrics {
                    month: month(1),
                    transaction_count: 100,
                    total_fee: 1.0,
                    avg_fee: 0.01,
                },
                MonthlyMetrics {
                    month: month(2),
                    transaction_count: 0,
                    total_fee: 0.0,
                    avg_fee: f64::NAN,
                },
            ],
            daily: if with_daily {
                vec![DailyMetrics {
                    transaction_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    daily_transaction_count: 42,
                }]
            } else {
                Vec::new()
            },
        }
    }

    #[test]
    fn charts_come_in_fixed_order() {
        let charts = build_charts(
            &metrics(Asset::Bitcoin, true),
            &metrics(Asset::Ethereum, true),
            LookbackWindow::TenYears,
        );

        let ids: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "btc-volume",
                "btc-total-fee",
                "btc-avg-fee",
                "eth-volume",
                "eth-total-fee",
                "eth-avg-fee",
                "avg-fee-comparison",
                "daily-comparison",
            ]
        );
    }

    #[test]
    fn volume_titles_follow_the_window() {
        let charts = build_charts(
            &metrics(Asset::Bitcoin, false),
            &metrics(Asset::Ethereum, false),
            LookbackWindow::FiveYears,
        );

        assert_eq!(charts[0].title, "Bitcoin Transaction Volume Over 5 Years");
        assert_eq!(charts[3].title, "Ethereum Transaction Volume Over 5 Years");
    }

    #[test]
    fn daily_comparison_is_omitted_without_daily_rows() {
        let charts = build_charts(
            &metrics(Asset::Bitcoin, false),
            &metrics(Asset::Ethereum, false),
            LookbackWindow::TenYears,
        );

        assert_eq!(charts.len(), 7);
        assert!(charts.iter().all(|c| c.id != "daily-comparison"));
    }

    #[test]
    fn comparison_charts_have_one_series_per_asset_and_a_legend() {
        let charts = build_charts(
            &metrics(Asset::Bitcoin, true),
            &metrics(Asset::Ethereum, true),
            LookbackWindow::TenYears,
        );

        for chart in &charts[6..] {
            assert_eq!(chart.series.len(), 2, "{}", chart.id);
            assert!(chart.style.legend);
        }
        assert_eq!(charts[7].series[0].opacity, 0.7);
        assert_eq!(charts[7].style.width, 1400);
    }

    #[test]
    fn undefined_average_is_carried_into_the_series() {
        let charts = build_charts(
            &metrics(Asset::Bitcoin, false),
            &metrics(Asset::Ethereum, false),
            LookbackWindow::TenYears,
        );

        let avg = &charts[2].series[0];
        assert!(avg.markers);
        assert_eq!(avg.points.len(), 2);
        assert!(avg.points[1].value.is_nan());
    }

    #[test]
    fn building_twice_gives_identical_specs() {
        let btc = metrics(Asset::Bitcoin, true);
        let eth = metrics(Asset::Ethereum, true);
        let first = build_charts(&btc, &eth, LookbackWindow::TwoYears);
        let second = build_charts(&btc, &eth, LookbackWindow::TwoYears);

        // NaN != NaN, so compare serialised forms.
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
