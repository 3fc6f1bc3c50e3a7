use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Map, Value};
use shopping_kpi::config::AppConfig;
use shopping_kpi::{CsvConnector, Kpi, MetricsEngine, Normalizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shopping-kpi")]
#[command(about = "Clean a shopping trends snapshot and report its KPIs")]
struct Args {
    /// Path to the shopping trends CSV (default: $SHOPPING_KPI_DATA or data/shopping_trends.csv)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// KPI to report; repeat for several. Reports every KPI when omitted.
    #[arg(short, long = "kpi")]
    kpis: Vec<String>,

    /// Write the normalized dataset to this CSV path
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env().with_data_path(args.data);

    let kpis = if args.kpis.is_empty() {
        Kpi::ALL.to_vec()
    } else {
        args.kpis
            .iter()
            .map(|name| name.parse::<Kpi>())
            .collect::<shopping_kpi::Result<Vec<_>>>()?
    };

    info!("Loading {}", config.data_path.display());
    let raw = CsvConnector::from_path(&config.data_path)
        .with_context(|| format!("Failed to open {}", config.data_path.display()))?
        .read_table()
        .context("Failed to read CSV")?;
    let (dataset, summary) = Normalizer::normalize_with_summary(&raw)?;
    info!(
        "Kept {} rows, dropped {} missing / {} age / {} amount",
        summary.kept_rows, summary.dropped_missing, summary.dropped_age, summary.dropped_amount
    );

    if let Some(path) = &args.export {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        dataset
            .write_csv(&mut file)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Exported normalized dataset to {}", path.display());
    }

    let engine = MetricsEngine::new(Arc::new(dataset));
    let mut report = Map::new();
    for kpi in kpis {
        let value = match engine.compute(kpi) {
            Ok(result) => serde_json::to_value(result)?,
            Err(e) => json!({ "error": e.to_string() }),
        };
        report.insert(kpi.name().to_string(), value);
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(report))?);

    Ok(())
}
