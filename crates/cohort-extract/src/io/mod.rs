//! IO utilities for reading raw cohort exports and writing aligned outputs.

pub mod delimited;
pub mod output;

pub use delimited::{
    read_name_list, read_table, read_table_from_reader, Delimiter, RawTable, TableSpec,
};
pub use output::{render_csv, write_outputs, OutputPaths};
