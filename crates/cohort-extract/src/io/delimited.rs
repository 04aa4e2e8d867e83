//! Delimited-text reader for roster files and raw cohort exports.
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Where a table lives and how its leading lines are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub path: PathBuf,
    pub delimiter: Delimiter,
    /// Lines discarded before the header (or before the data when headerless).
    pub skip_before_header: usize,
    pub has_header: bool,
    /// Rows discarded right after the header, e.g. a units row.
    pub skip_after_header: usize,
}

impl TableSpec {
    /// Comma-delimited with a single header line.
    pub fn csv<P: Into<PathBuf>>(path: P) -> Self {
        TableSpec {
            path: path.into(),
            delimiter: Delimiter::Comma,
            skip_before_header: 0,
            has_header: true,
            skip_after_header: 0,
        }
    }

    /// Tab-delimited with a single header line.
    pub fn tsv<P: Into<PathBuf>>(path: P) -> Self {
        TableSpec {
            delimiter: Delimiter::Tab,
            ..TableSpec::csv(path)
        }
    }

    pub fn headerless(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn skip_before_header(mut self, n: usize) -> Self {
        self.skip_before_header = n;
        self
    }

    pub fn skip_after_header(mut self, n: usize) -> Self {
        self.skip_after_header = n;
        self
    }
}

/// Header plus data records, cells untouched.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

/// Read a table described by `spec` from disk.
pub fn read_table(spec: &TableSpec) -> Result<RawTable> {
    let file = std::fs::File::open(&spec.path)
        .with_context(|| format!("Failed to open file: {}", spec.path.display()))?;
    read_table_from_reader(std::io::BufReader::new(file), spec)
        .with_context(|| format!("Failed to read table: {}", spec.path.display()))
}

/// Read a table from any reader; `spec.path` is only used for messages.
pub fn read_table_from_reader<R: Read>(reader: R, spec: &TableSpec) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(spec.delimiter.as_byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = reader.records().enumerate();

    for _ in 0..spec.skip_before_header {
        if let Some((row_idx, result)) = records.next() {
            result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        }
    }

    let headers = if spec.has_header {
        match records.next() {
            Some((row_idx, result)) => {
                result.with_context(|| format!("Failed to read header row {}", row_idx + 1))?
            }
            None => anyhow::bail!("Missing header row in {}", spec.path.display()),
        }
    } else {
        StringRecord::new()
    };

    if spec.has_header {
        for _ in 0..spec.skip_after_header {
            if let Some((row_idx, result)) = records.next() {
                result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
            }
        }
    }

    let mut rows = Vec::new();
    for (row_idx, result) in records {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        rows.push(record);
    }

    log::debug!(
        "[CohortExtract::IO] Read {} rows x {} columns from {}",
        rows.len(),
        headers.len(),
        spec.path.display()
    );

    Ok(RawTable { headers, rows })
}

/// Read a headerless list of column names, one per line.
pub fn read_name_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let table = read_table(&TableSpec::csv(path.as_ref()).headerless())?;
    let names: Vec<String> = table
        .rows
        .iter()
        .filter_map(|r| r.get(0))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        anyhow::bail!("Variable list is empty: {}", path.as_ref().display());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_units_row() {
        let text = "a\tb\nunits\tunits\n1\t2\n3\t4\n";
        let spec = TableSpec::tsv("mem.txt").skip_after_header(1);
        let table = read_table_from_reader(text.as_bytes(), &spec).unwrap();
        assert_eq!(table.headers.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get(0), Some("1"));
    }

    #[test]
    fn test_skips_leading_line() {
        let text = "description line\nID,VISIT\nA1,V1\n";
        let spec = TableSpec::csv("mem.csv").skip_before_header(1);
        let table = read_table_from_reader(text.as_bytes(), &spec).unwrap();
        assert_eq!(table.headers.get(1), Some("VISIT"));
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_headerless() {
        let text = "1\n2\n";
        let spec = TableSpec::csv("mem.csv").headerless();
        let table = read_table_from_reader(text.as_bytes(), &spec).unwrap();
        assert!(table.headers.is_empty());
        assert_eq!(table.rows.len(), 2);
    }
}
