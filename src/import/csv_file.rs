//! Flat CSV files
//!
//! The header row names record fields (aliases accepted, see
//! `canonical_field`). Empty cells are absent values. Rows are handed out in
//! fixed-size batches.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::{ImportBatch, ImportError, Importer};
use crate::models::{DataSource, FoodCandidate};

pub const DEFAULT_BATCH_SIZE: usize = 500;

pub struct CsvImporter {
    name: String,
    source: DataSource,
    reader: csv::Reader<Box<dyn Read>>,
    headers: StringRecord,
    batch_size: usize,
    /// Data rows read so far (header excluded)
    rows_read: usize,
    done: bool,
}

impl CsvImporter {
    pub fn open<P: AsRef<Path>>(path: P, source: DataSource, batch_size: usize) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(label, Box::new(file), source, batch_size)
    }

    pub fn from_reader(
        label: impl Into<String>,
        input: Box<dyn Read>,
        source: DataSource,
        batch_size: usize,
    ) -> Result<Self, ImportError> {
        let label = label.into();
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(input);
        let headers = reader.headers()?.clone();

        if !headers.iter().any(|h| crate::models::canonical_field(h) == "name") {
            return Err(ImportError::Invalid(format!("{}: no name column in header", label)));
        }

        info!(file = %label, columns = headers.len(), "opened CSV file");
        Ok(Self {
            name: format!("csv:{}", label),
            source,
            reader,
            headers,
            batch_size: batch_size.max(1),
            rows_read: 0,
            done: false,
        })
    }

    fn candidate(&self, row: &StringRecord) -> Option<FoodCandidate> {
        let fields: Map<String, Value> = self
            .headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();

        match FoodCandidate::from_fields(self.source, &fields) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                error!(row = self.rows_read, "rejecting row: {}", e);
                None
            }
        }
    }
}

impl Importer for CsvImporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_batch(&mut self) -> Result<Option<ImportBatch>, ImportError> {
        if self.done {
            return Ok(None);
        }

        let first_row = self.rows_read + 1;
        let mut candidates = Vec::with_capacity(self.batch_size);
        let mut row = StringRecord::new();
        let mut rows_in_batch = 0;

        while rows_in_batch < self.batch_size {
            match self.reader.read_record(&mut row) {
                Ok(true) => {
                    self.rows_read += 1;
                    rows_in_batch += 1;
                    if let Some(candidate) = self.candidate(&row) {
                        candidates.push(candidate);
                    }
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    self.rows_read += 1;
                    rows_in_batch += 1;
                    warn!(row = self.rows_read, "skipping unreadable row: {}", e);
                }
            }
        }

        if rows_in_batch == 0 {
            return Ok(None);
        }
        let label = format!("rows {}-{}", first_row, self.rows_read);
        Ok(Some(ImportBatch::new(label, candidates)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn importer(text: &'static str, batch_size: usize) -> CsvImporter {
        CsvImporter::from_reader("test.csv", Box::new(text.as_bytes()), DataSource::Manual, batch_size).unwrap()
    }

    #[test]
    fn test_rows_map_to_candidates() {
        let mut csv = importer(
            "name,brand_name,serving_size,calories,carbs_g,protein_g\n\
             Greek Yogurt,Fage,170 g,100,6,18\n\
             Kale,,,,,\n",
            10,
        );

        let batch = csv.next_batch().unwrap().unwrap();
        assert_eq!(batch.label, "rows 1-2");
        assert_eq!(batch.candidates.len(), 2);

        let yogurt = &batch.candidates[0];
        assert_eq!(yogurt.brand.as_deref(), Some("Fage"));
        assert_eq!(yogurt.nutrients.total_carbohydrate_g, Some(6.0));
        assert_eq!(yogurt.nutrients.protein_g, Some(18.0));

        let kale = &batch.candidates[1];
        assert_eq!(kale.brand, None);
        assert!(kale.nutrients.is_empty());

        assert!(csv.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_fixed_size_batches() {
        let mut csv = importer("name,calories\nA,1\nB,2\nC,3\nD,4\nE,5\n", 2);
        let sizes: Vec<usize> = std::iter::from_fn(|| csv.next_batch().unwrap())
            .map(|b| b.candidates.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_malformed_cells_dropped() {
        let mut csv = importer("name,calories,sodium_mg\nTaco,n/a,370\n,10,10\n", 10);
        let batch = csv.next_batch().unwrap().unwrap();
        assert_eq!(batch.candidates.len(), 1);
        assert_eq!(batch.candidates[0].nutrients.calories, None);
        assert_eq!(batch.candidates[0].nutrients.sodium_mg, Some(370.0));
    }

    #[test]
    fn test_header_without_name_rejected() {
        let result = CsvImporter::from_reader(
            "bad.csv",
            Box::new("calories,protein_g\n1,2\n".as_bytes()),
            DataSource::Manual,
            10,
        );
        assert!(matches!(result, Err(ImportError::Invalid(_))));
    }
}
