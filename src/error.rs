use thiserror::Error;

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Empty dataset: {0} has no rows to divide by")]
    EmptyDataset(&'static str),

    #[error("Unknown KPI: {0}")]
    UnknownKpi(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

pub type Result<T> = std::result::Result<T, KpiError>;
