//! Tabular data source: a user-supplied CSV or spreadsheet file parsed
//! into a rectangular numeric table, served as fixed-size row blocks
//! through a wrapping cursor.
//!
//! Classification checks are periodic and unbounded, so finite uploaded
//! data is recycled: the cursor wraps to row 0 instead of exhausting.

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;

use crate::signal::SAMPLES_PER_CHANNEL;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Unsupported file format: {0}. Upload a CSV or XLSX file")]
    UnsupportedFormat(String),

    #[error("Failed to parse dataset: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded dataset plus its read position. The cursor is ordinary
/// state on the value: callers advance it through [`next_block`] and can
/// inspect or reset it at any time.
///
/// [`next_block`]: FileDataset::next_block
#[derive(Debug, Clone)]
pub struct FileDataset {
    rows: Vec<Vec<f64>>,
    cursor: usize,
    channel_width: usize,
    file_name: Option<String>,
}

impl Default for FileDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl FileDataset {
    pub fn new() -> Self {
        Self::with_channel_width(SAMPLES_PER_CHANNEL)
    }

    pub fn with_channel_width(channel_width: usize) -> Self {
        Self {
            rows: Vec::new(),
            cursor: 0,
            channel_width,
            file_name: None,
        }
    }

    /// Parse `path` and replace the current contents.
    ///
    /// The previous rows and cursor are kept intact on any failure. A
    /// first row containing a cell that does not parse as a finite number
    /// is treated as a header and excluded; every other row with a
    /// non-numeric cell is dropped entirely.
    pub fn load(&mut self, path: &Path) -> Result<(), DatasetError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let cells = match extension.as_str() {
            "csv" => parse_csv(path)?,
            "xlsx" | "xls" => parse_sheet(path)?,
            _ => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                return Err(DatasetError::UnsupportedFormat(name));
            }
        };

        let rows = filter_numeric_rows(cells);
        if rows.is_empty() {
            return Err(DatasetError::Parse(
                "no numeric rows remain after filtering".into(),
            ));
        }

        self.rows = rows;
        self.cursor = 0;
        self.file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Ok(())
    }

    /// The next `n` rows starting at the cursor, each normalized to
    /// exactly the channel width: zero-padded on the right when short,
    /// truncated to the leading columns when long.
    ///
    /// The cursor advances one row at a time and wraps to 0 whenever it
    /// reaches the row count, so this never fails for a non-empty
    /// dataset. Returns `None` only when nothing is loaded.
    pub fn next_block(&mut self, n: usize) -> Option<Vec<Vec<f64>>> {
        if self.rows.is_empty() {
            return None;
        }

        let mut block = Vec::with_capacity(n);
        for _ in 0..n {
            if self.cursor >= self.rows.len() {
                self.cursor = 0;
            }
            block.push(normalize_row(&self.rows[self.cursor], self.channel_width));
            self.cursor += 1;
        }

        Some(block)
    }

    /// Cursor back to the first row; loaded rows are untouched.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn is_loaded(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }
}

fn normalize_row(row: &[f64], width: usize) -> Vec<f64> {
    let mut normalized = Vec::with_capacity(width);
    normalized.extend(row.iter().take(width));
    normalized.resize(width, 0.0);
    normalized
}

fn parse_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_csv(path: &Path) -> Result<Vec<Vec<Option<f64>>>, DatasetError> {
    let contents = fs::read_to_string(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DatasetError::Parse(e.to_string()))?;
        rows.push(record.iter().map(parse_cell).collect());
    }
    Ok(rows)
}

fn parse_sheet(path: &Path) -> Result<Vec<Vec<Option<f64>>>, DatasetError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| DatasetError::Parse(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DatasetError::Parse("workbook has no sheets".into()))?
        .map_err(|e| DatasetError::Parse(e.to_string()))?;

    let rows = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Float(v) => Some(*v).filter(|v| v.is_finite()),
                    Data::Int(v) => Some(*v as f64),
                    Data::String(s) => parse_cell(s),
                    _ => None,
                })
                .collect()
        })
        .collect();
    Ok(rows)
}

fn filter_numeric_rows(raw: Vec<Vec<Option<f64>>>) -> Vec<Vec<f64>> {
    let Some(first) = raw.first() else {
        return Vec::new();
    };

    let has_header = first.iter().any(|cell| cell.is_none());
    let skip = usize::from(has_header);

    raw.into_iter()
        .skip(skip)
        .filter_map(|row| row.into_iter().collect::<Option<Vec<f64>>>())
        .filter(|row| !row.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn first_cells(block: &[Vec<f64>]) -> Vec<f64> {
        block.iter().map(|row| row[0]).collect()
    }

    #[test]
    fn cursor_wraps_in_deterministic_cyclic_order() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "four_rows.csv",
            "0,1,2,3\n10,11,12,13\n20,21,22,23\n30,31,32,33\n",
        );

        let mut dataset = FileDataset::with_channel_width(4);
        dataset.load(&path).unwrap();
        assert_eq!(dataset.row_count(), 4);

        let block = dataset.next_block(6).unwrap();
        assert_eq!(first_cells(&block), vec![0.0, 10.0, 20.0, 30.0, 0.0, 10.0]);
        assert_eq!(dataset.cursor_position(), 2);

        let block = dataset.next_block(6).unwrap();
        assert_eq!(
            first_cells(&block),
            vec![20.0, 30.0, 0.0, 10.0, 20.0, 30.0]
        );
        assert_eq!(dataset.cursor_position(), 4);
    }

    #[test]
    fn short_rows_are_zero_padded_and_long_rows_truncated() {
        let dir = TempDir::new().unwrap();
        let long_row: Vec<String> = (0..SAMPLES_PER_CHANNEL + 5)
            .map(|i| i.to_string())
            .collect();
        let contents = format!("1.5,2.5,3.5\n{}\n", long_row.join(","));
        let path = write_csv(&dir, "ragged.csv", &contents);

        let mut dataset = FileDataset::new();
        dataset.load(&path).unwrap();

        let block = dataset.next_block(2).unwrap();

        let padded = &block[0];
        assert_eq!(padded.len(), SAMPLES_PER_CHANNEL);
        assert_eq!(&padded[..3], &[1.5, 2.5, 3.5]);
        assert!(padded[3..].iter().all(|v| *v == 0.0));

        let truncated = &block[1];
        assert_eq!(truncated.len(), SAMPLES_PER_CHANNEL);
        assert_eq!(truncated[SAMPLES_PER_CHANNEL - 1], (SAMPLES_PER_CHANNEL - 1) as f64);
    }

    #[test]
    fn non_numeric_first_row_is_excluded_as_header() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "header.csv", "timestamp,ch1,ch2\n0.1,0.2,0.3\n");

        let mut dataset = FileDataset::with_channel_width(3);
        dataset.load(&path).unwrap();
        assert_eq!(dataset.row_count(), 1);
        assert_eq!(dataset.next_block(1).unwrap()[0], vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn numeric_first_row_is_kept_as_data() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "no_header.csv", "0.1,0.2,0.3\n0.4,0.5,0.6\n");

        let mut dataset = FileDataset::with_channel_width(3);
        dataset.load(&path).unwrap();
        assert_eq!(dataset.row_count(), 2);
    }

    #[test]
    fn rows_with_non_numeric_cells_are_dropped() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "mixed.csv", "1,2,3\n1,oops,3\n4,5,6\n");

        let mut dataset = FileDataset::with_channel_width(3);
        dataset.load(&path).unwrap();

        assert_eq!(dataset.row_count(), 2);
        let block = dataset.next_block(2).unwrap();
        assert_eq!(first_cells(&block), vec![1.0, 4.0]);
    }

    #[test]
    fn malformed_file_fails_and_preserves_previous_dataset() {
        let dir = TempDir::new().unwrap();
        let good = write_csv(&dir, "good.csv", "1,2\n3,4\n");
        let bad = write_csv(&dir, "bad.csv", "a,b\nc,d\ne,f\n");

        let mut dataset = FileDataset::with_channel_width(2);
        dataset.load(&good).unwrap();
        dataset.next_block(1).unwrap();

        let err = dataset.load(&bad).unwrap_err();
        assert!(matches!(err, DatasetError::Parse(_)));
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.cursor_position(), 1);
        assert_eq!(dataset.file_name(), Some("good.csv"));
    }

    #[test]
    fn unrecognized_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.txt", "1,2,3\n");

        let mut dataset = FileDataset::new();
        let err = dataset.load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedFormat(_)));
        assert!(!dataset.is_loaded());
    }

    #[test]
    fn empty_dataset_yields_no_blocks() {
        let mut dataset = FileDataset::new();
        assert!(dataset.next_block(6).is_none());
    }

    #[test]
    fn reset_rewinds_cursor_only() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "rows.csv", "1,2\n3,4\n5,6\n");

        let mut dataset = FileDataset::with_channel_width(2);
        dataset.load(&path).unwrap();
        dataset.next_block(2).unwrap();
        assert_eq!(dataset.cursor_position(), 2);

        dataset.reset();
        assert_eq!(dataset.cursor_position(), 0);
        assert_eq!(dataset.row_count(), 3);
    }
}
