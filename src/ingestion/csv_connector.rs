//! CSV Connector - Reads a delimited shopping snapshot into a RawTable

use crate::error::{KpiError, Result};
use crate::ingestion::{cell_value, RawTable};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// CSV Connector - Wraps a CSV reader and converts it into raw rows.
pub struct CsvConnector<R: Read> {
    source_id: String,
    reader: R,
}

impl CsvConnector<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            source_id: path.display().to_string(),
            reader: file,
        })
    }
}

impl<'a> CsvConnector<&'a [u8]> {
    pub fn from_text(csv_text: &'a str) -> Self {
        Self {
            source_id: "inline".to_string(),
            reader: csv_text.as_bytes(),
        }
    }
}

impl<R: Read> CsvConnector<R> {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Consume the source and return every row, with short rows padded by
    /// missing cells so each row lines up with the header.
    pub fn read_table(self) -> Result<RawTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(self.reader);

        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(KpiError::DataFormat(format!(
                "{} has no header row",
                self.source_id
            )));
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let row = (0..headers.len())
                .map(|idx| record.get(idx).and_then(cell_value))
                .collect();
            rows.push(row);
        }

        debug!("Read {} rows x {} columns from {}", rows.len(), headers.len(), self.source_id);

        Ok(RawTable { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_short_cells_are_missing() {
        let table = CsvConnector::from_text("Age,Gender,Season\n35, Male ,\n40,  \n")
            .read_table()
            .unwrap();

        assert_eq!(table.headers, vec!["Age", "Gender", "Season"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec![Some("35".to_string()), Some(" Male ".to_string()), None]);
        assert_eq!(table.rows[1], vec![Some("40".to_string()), None, None]);
    }

    #[test]
    fn test_null_sentinel_cells_are_missing() {
        let table = CsvConnector::from_text("Age,Gender,Rating\n30,NA,NaN\n40,Male,null\n50,Female,4\n")
            .read_table()
            .unwrap();

        assert_eq!(table.rows[0], vec![Some("30".to_string()), None, None]);
        assert_eq!(table.rows[1], vec![Some("40".to_string()), Some("Male".to_string()), None]);
        assert_eq!(table.rows[2][2], Some("4".to_string()));
    }

    #[test]
    fn test_empty_input_is_a_format_error() {
        let err = CsvConnector::from_text("").read_table().unwrap_err();
        assert!(matches!(err, KpiError::DataFormat(_)));
    }
}
