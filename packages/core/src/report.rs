//! One-shot report: fetch, normalize, and write every chart to its own file.

use std::path::{Path, PathBuf};

use crate::charts::{build_charts, ChartRenderer};
use crate::error::AppError;
use crate::models::LookbackWindow;
use crate::sources::{load_dataset, MetricsSource};

/// Run the pipeline once and write each chart as `{NN}-{id}.{ext}` under
/// `out_dir`, in catalog order. Returns the written paths.
pub async fn run_report(
    source: &(dyn MetricsSource + Send + Sync),
    window: LookbackWindow,
    out_dir: &Path,
    renderer: &(dyn ChartRenderer + Send + Sync),
) -> Result<Vec<PathBuf>, AppError> {
    let dataset = load_dataset(source, window).await?;
    let charts = build_charts(&dataset.bitcoin, &dataset.ethereum, window);

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|err| AppError::io(out_dir, err))?;

    let mut written = Vec::with_capacity(charts.len());
    for (index, spec) in charts.iter().enumerate() {
        let document = renderer.render(spec)?;
        let path = out_dir.join(format!(
            "{:02}-{}.{}",
            index + 1,
            spec.id,
            renderer.extension()
        ));
        tokio::fs::write(&path, document)
            .await
            .map_err(|err| AppError::io(&path, err))?;
        tracing::info!("Wrote \"{}\" to {}", spec.title, path.display());
        written.push(path);
    }

    Ok(written)
}
