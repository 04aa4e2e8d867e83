#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use cohort_extract::io::{read_table_from_reader, RawTable, TableSpec};
use cohort_extract::pipeline::TableLoader;

/// Serves table text from memory, keyed by the path a plan asks for.
#[derive(Debug, Clone, Default)]
pub struct MemLoader {
    files: HashMap<PathBuf, String>,
}

impl MemLoader {
    pub fn with<P: Into<PathBuf>>(mut self, path: P, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl TableLoader for MemLoader {
    fn load(&self, spec: &TableSpec) -> anyhow::Result<RawTable> {
        let text = self
            .files
            .get(&spec.path)
            .with_context(|| format!("No such file: {:?}", spec.path))?;
        read_table_from_reader(text.as_bytes(), spec)
    }
}

/// A delimited line `width` cells wide, blank except for `cells`.
pub fn wide_row(width: usize, sep: &str, cells: &[(usize, &str)]) -> String {
    let mut row = vec![String::new(); width];
    for (idx, value) in cells {
        row[*idx] = value.to_string();
    }
    row.join(sep)
}

/// Header line `c0,c1,...`.
pub fn wide_header(width: usize, sep: &str) -> String {
    (0..width).map(|i| format!("c{}", i)).collect::<Vec<_>>().join(sep)
}

/// Text of a GSP export holding one row per `(subject, sex, age, hand, neo)`.
pub fn gsp_export(rows: &[(u32, &str, f64, &str, Option<f64>)]) -> String {
    let mut lines = vec![wide_header(126, ",")];
    for (id, sex, age, hand, neo) in rows {
        let id = format!("Sub{:04}_S1", id);
        let age = age.to_string();
        let neo = neo.map(|v| v.to_string()).unwrap_or_default();
        lines.push(wide_row(
            126,
            ",",
            &[
                (0, id.as_str()),
                (4, *sex),
                (5, age.as_str()),
                (6, *hand),
                (48, "1500000"),
                (49, "1100000"),
                (94, neo.as_str()),
                (125, "110"),
            ],
        ));
    }
    lines.join("\n") + "\n"
}
