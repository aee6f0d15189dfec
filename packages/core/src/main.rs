use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;

use crypto_fee_analytics::api::{create_dashboard_router, DashboardState};
use crypto_fee_analytics::charts::SvgRenderer;
use crypto_fee_analytics::cli::{Cli, Command};
use crypto_fee_analytics::config::Config;
use crypto_fee_analytics::error::AppError;
use crypto_fee_analytics::logging::init_logging;
use crypto_fee_analytics::report::run_report;
use crypto_fee_analytics::sources;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_env()?;
    config.apply_cli(&cli)?;
    tracing::info!("Starting with config: {:?}", config);

    let source = sources::from_config(&config)?;

    match cli.command {
        Command::Report { .. } => {
            let renderer = SvgRenderer::new();
            let written =
                run_report(source.as_ref(), config.window, &config.out_dir, &renderer).await?;
            tracing::info!(
                "Report complete: {} charts in {}",
                written.len(),
                config.out_dir.display()
            );
        }
        Command::Serve { .. } => {
            let state = DashboardState::new(source, Arc::new(SvgRenderer::new()));
            let app = create_dashboard_router(state);

            let listener = TcpListener::bind(config.dashboard_addr)
                .await
                .map_err(|err| AppError::Network(format!(
                    "cannot bind {}: {}",
                    config.dashboard_addr, err
                )))?;
            tracing::info!("Dashboard listening on http://{}", config.dashboard_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    signal::ctrl_c().await.ok();
                    tracing::info!("Shutdown signal received. Stopping dashboard.");
                })
                .await
                .map_err(|err| AppError::Network(err.to_string()))?;
        }
    }

    Ok(())
}
