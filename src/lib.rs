pub mod config;
pub mod dataset;
pub mod error;
pub mod ingestion;
pub mod metrics;
pub mod normalizer;

pub use dataset::{AgeGroup, NormalizedDataset, NormalizedRecord};
pub use error::{KpiError, Result};
pub use ingestion::{CsvConnector, RawTable};
pub use metrics::{ItemCount, Kpi, KpiResult, MetricsEngine};
pub use normalizer::{normalize, NormalizationSummary, Normalizer};

use std::path::Path;
use std::sync::Arc;

/// Read and normalize a CSV snapshot, returning an engine ready for queries.
pub fn load_engine(path: impl AsRef<Path>) -> Result<MetricsEngine> {
    let raw = CsvConnector::from_path(path)?.read_table()?;
    let dataset = normalize(&raw)?;
    Ok(MetricsEngine::new(Arc::new(dataset)))
}
