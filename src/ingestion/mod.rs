//! Ingestion Module
//!
//! Loads the raw shopping snapshot before any cleaning happens. Values are kept
//! as text; the normalizer decides what they mean.

pub mod csv_connector;

pub use csv_connector::CsvConnector;

use serde::{Deserialize, Serialize};

/// Cell texts read as null, the same set pandas' `read_csv` treats as NA.
pub const NULL_SENTINELS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a cell counts as missing: blank, or exactly one of [`NULL_SENTINELS`]
/// once surrounding whitespace is removed.
pub fn is_missing(cell: &str) -> bool {
    NULL_SENTINELS.contains(&cell.trim())
}

/// `None` for a missing cell, the original text otherwise.
pub fn cell_value(cell: &str) -> Option<String> {
    if is_missing(cell) {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Raw tabular input: source headers as written, one `Option<String>` per
/// cell where `None` marks a missing value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row of text cells; blank or null-sentinel cells become missing.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<Option<String>> = cells
            .into_iter()
            .map(|c| cell_value(&c.into()))
            .collect();
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sentinels_are_missing() {
        for cell in ["", "   ", "NA", " N/A ", "n/a", "NaN", "nan", "null", "NULL", "#N/A", "None", "<NA>"] {
            assert!(is_missing(cell), "{:?} should be missing", cell);
        }
        for cell in ["Na", "none", "0", "unrated", "abc", "Nancy"] {
            assert!(!is_missing(cell), "{:?} should be kept", cell);
        }
    }

    #[test]
    fn test_push_row_marks_sentinels_missing() {
        let mut table = RawTable::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(["NA", "x"]);
        assert_eq!(table.rows[0], vec![None, Some("x".to_string()), None]);
    }
}
