//! Application configuration for the CLI and the KPI server.

use std::path::PathBuf;

pub const DATA_PATH_VAR: &str = "SHOPPING_KPI_DATA";
pub const BIND_ADDR_VAR: &str = "SHOPPING_KPI_BIND";

pub const DEFAULT_DATA_PATH: &str = "data/shopping_trends.csv";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment, reading a `.env` file first if one
    /// exists.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; blank values fall back to the
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            data_path: get(DATA_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            bind_addr: get(BIND_ADDR_VAR).unwrap_or(defaults.bind_addr),
        }
    }

    pub fn with_data_path(mut self, data_path: Option<PathBuf>) -> Self {
        if let Some(path) = data_path {
            self.data_path = path;
        }
        self
    }
}
